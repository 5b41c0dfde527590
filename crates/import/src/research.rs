use regex::Regex;
use serde::Serialize;

/// Topic and researcher pulled from a research description such as
/// `25 심층연구(스포츠영양)_김철수 회의비`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResearchNote {
    pub topic: String,
    pub researcher: String,
}

impl ResearchNote {
    /// Table heading used on the research summary sheet.
    pub fn title(&self) -> String {
        format!("{} - {}", self.topic, self.researcher)
    }
}

pub struct ResearchNoteParser {
    topic: Option<Regex>,
    researcher: Regex,
}

impl ResearchNoteParser {
    /// `prefix` is the research rule prefix; without one no topic is ever
    /// found.
    pub fn new(prefix: Option<&str>) -> Result<Self, regex::Error> {
        let topic = prefix
            .map(|p| Regex::new(&format!(r"{}\(([^)]+)\)", regex::escape(p))))
            .transpose()?;
        let researcher = Regex::new(r"_([가-힣]+)")?;
        Ok(Self { topic, researcher })
    }

    pub fn topic(&self, description: &str) -> Option<String> {
        self.topic
            .as_ref()?
            .captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn researcher(&self, description: &str) -> Option<String> {
        self.researcher
            .captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Both parts are required for a row to belong to a per-researcher table.
    pub fn parse(&self, description: &str) -> Option<ResearchNote> {
        Some(ResearchNote {
            topic: self.topic(description)?,
            researcher: self.researcher(description)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ResearchNoteParser {
        ResearchNoteParser::new(Some("25 심층연구")).unwrap()
    }

    #[test]
    fn extracts_topic_and_researcher() {
        let note = parser().parse("25 심층연구(스포츠영양)_김철수 회의비").unwrap();
        assert_eq!(note.topic, "스포츠영양");
        assert_eq!(note.researcher, "김철수");
        assert_eq!(note.title(), "스포츠영양 - 김철수");
    }

    #[test]
    fn researcher_without_topic() {
        let p = parser();
        assert_eq!(p.researcher("25 심층연구_이영희"), Some("이영희".to_string()));
        assert_eq!(p.topic("25 심층연구_이영희"), None);
        assert_eq!(p.parse("25 심층연구_이영희"), None);
    }

    #[test]
    fn prefix_is_matched_literally() {
        let p = ResearchNoteParser::new(Some("R&D (v2)")).unwrap();
        assert_eq!(p.topic("R&D (v2)(bio)_박"), Some("bio".to_string()));
    }

    #[test]
    fn no_prefix_means_no_topic() {
        let p = ResearchNoteParser::new(None).unwrap();
        assert_eq!(p.topic("25 심층연구(AI)_김"), None);
        assert_eq!(p.researcher("25 심층연구(AI)_김"), Some("김".to_string()));
    }

    #[test]
    fn researcher_stops_at_non_hangul() {
        assert_eq!(
            parser().researcher("25 심층연구(AI)_홍길동2차"),
            Some("홍길동".to_string())
        );
    }
}
