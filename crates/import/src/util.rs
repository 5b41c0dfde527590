/// Edit distance over characters (not bytes), so Korean headers count one
/// edit per syllable.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let source: Vec<char> = s1.chars().collect();
    let target: Vec<char> = s2.chars().collect();
    if source.is_empty() || target.is_empty() {
        return source.len().max(target.len());
    }

    // row[j] holds the distance between the current source prefix and target[..j]
    let mut row: Vec<usize> = (0..=target.len()).collect();
    for (i, sc) in source.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, tc) in target.iter().enumerate() {
            let substitution = diagonal + usize::from(sc != tc);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[target.len()]
}

/// Closest header to `wanted` among `available`, if any is within two edits
/// or contains / is contained by it.
pub fn closest_header<'a>(wanted: &str, available: &'a [String]) -> Option<&'a str> {
    available
        .iter()
        .map(|h| (h, levenshtein_distance(wanted, h.trim())))
        .filter(|(h, d)| *d <= 2 || h.contains(wanted) || wanted.contains(h.trim()))
        .filter(|(h, _)| !h.trim().is_empty())
        .min_by_key(|(_, d)| *d)
        .map(|(h, _)| h.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_zero() {
        assert_eq!(levenshtein_distance("적요", "적요"), 0);
        assert_eq!(levenshtein_distance("", ""), 0);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(levenshtein_distance("총지급액", "지급액"), 1);
        assert_eq!(levenshtein_distance("", "발의일자"), 4);
    }

    #[test]
    fn commutative() {
        assert_eq!(
            levenshtein_distance("예산과목", "예산 과목"),
            levenshtein_distance("예산 과목", "예산과목")
        );
    }

    #[test]
    fn closest_header_suggests_near_miss() {
        let headers = vec!["발의 일자".to_string(), "적요".to_string(), "비고".to_string()];
        assert_eq!(closest_header("발의일자", &headers), Some("발의 일자"));
        assert_eq!(closest_header("총지급액", &headers), None);
    }

    #[test]
    fn closest_header_accepts_containment() {
        let headers = vec!["총지급액(원)".to_string()];
        assert_eq!(closest_header("총지급액", &headers), Some("총지급액(원)"));
    }
}
