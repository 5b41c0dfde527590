use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::money::Money;
use super::period::{DateRange, FiscalYear};
use super::taxonomy::{default_categories, BudgetTaxonomy, CategorySpec, PlannedBudget};
use super::transaction::FundType;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Duplicate budget item in taxonomy: {0}")]
    DuplicateItem(String),
    #[error("Planned budget for {year} names unknown budget item '{item}'")]
    UnknownPlannedItem { year: FiscalYear, item: String },
    #[error("Rule '{rule}' names unknown default item '{item}'")]
    UnknownDefaultItem { rule: String, item: String },
    #[error("Invalid colour '{0}': expected six hex digits")]
    InvalidColor(String),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// A classification rule as configured: descriptions starting with `prefix`
/// belong to `fund`. Rules are evaluated in the listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRuleSpec {
    pub name: String,
    pub prefix: String,
    pub fund: FundType,
    /// Item assigned when nothing else on the row names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_item: Option<String>,
}

/// Recognized input headers (matched case-sensitively, first present wins)
/// and the layout of the raw line-item sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub amount: Vec<String>,
    pub budget_item: Vec<String>,
    pub output: Vec<String>,
    pub research_extra: Vec<String>,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            date: strings(&["발의일자"]),
            description: strings(&["적요"]),
            amount: strings(&["총지급액", "지출액"]),
            budget_item: strings(&["예산과목"]),
            output: strings(&["결의서", "발의일자", "번호", "적요", "작성자", "총지급액", "예산과목"]),
            research_extra: strings(&["연구자", "반영일"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardPalette {
    pub background: String,
    pub card: String,
    pub accent: String,
    pub text: String,
    pub good: String,
    pub warning: String,
    pub danger: String,
    pub business: String,
    pub research: String,
}

impl Default for DashboardPalette {
    fn default() -> Self {
        Self {
            background: "1C1C1C".to_string(),
            card: "404040".to_string(),
            accent: "C0C0C0".to_string(),
            text: "FFFFFF".to_string(),
            good: "10B981".to_string(),
            warning: "F59E0B".to_string(),
            danger: "EF4444".to_string(),
            business: "3B82F6".to_string(),
            research: "8B5CF6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Styling {
    pub font_name: String,
    pub header_fill: String,
    pub header_font: String,
    pub total_fill: String,
    pub default_column_width: f64,
    pub column_widths: BTreeMap<String, f64>,
    pub palette: DashboardPalette,
}

impl Default for Styling {
    fn default() -> Self {
        let column_widths = [
            ("결의서", 12.0),
            ("발의일자", 15.0),
            ("번호", 10.0),
            ("적요", 50.0),
            ("작성자", 12.0),
            ("총지급액", 15.0),
            ("예산과목", 25.0),
            ("연구자", 15.0),
            ("반영일", 15.0),
            ("예산목", 15.0),
            ("세목", 20.0),
            ("예산금액", 15.0),
            ("지출액", 15.0),
            ("센터", 15.0),
            ("심층연구", 15.0),
            ("예산잔액", 15.0),
            ("집행률", 10.0),
            ("사유", 30.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            font_name: "맑은 고딕".to_string(),
            header_fill: "366092".to_string(),
            header_font: "FFFFFF".to_string(),
            total_fill: "D9E1F2".to_string(),
            default_column_width: 12.0,
            column_widths,
            palette: DashboardPalette::default(),
        }
    }
}

impl Styling {
    pub fn column_width(&self, header: &str) -> f64 {
        self.column_widths
            .get(header)
            .copied()
            .unwrap_or(self.default_column_width)
    }

    fn colors(&self) -> [&str; 12] {
        let p = &self.palette;
        [
            &self.header_fill,
            &self.header_font,
            &self.total_fill,
            &p.background,
            &p.card,
            &p.accent,
            &p.text,
            &p.good,
            &p.warning,
            &p.danger,
            &p.business,
            &p.research,
        ]
    }
}

/// Parses `"366092"` or `"#366092"` into `0x366092`.
pub fn hex_color(value: &str) -> Result<u32, SettingsError> {
    let digits = value.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(SettingsError::InvalidColor(value.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| SettingsError::InvalidColor(value.to_string()))
}

/// Every knob of a run: rules, taxonomy, planned figures and styling. Built
/// once, validated, then shared read-only by each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_name: String,
    pub report_year: FiscalYear,
    pub fiscal_year_start_month: u32,
    pub unclassified_warning_threshold: f64,
    pub output_file_stem: String,
    /// Categories left out of the 인건비제외 execution rate.
    pub personnel_categories: Vec<String>,
    pub project_period: DateRange,
    pub columns: ColumnSettings,
    pub styling: Styling,
    pub rules: Vec<PrefixRuleSpec>,
    pub taxonomy: Vec<CategorySpec>,
    pub planned: Vec<PlannedBudget>,
}

impl Default for Settings {
    fn default() -> Self {
        let categories = default_categories();
        let zero_budget = categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .flat_map(|s| s.items.iter())
            .map(|i| (i.name.clone(), Money::zero()))
            .collect();

        let (period_start, period_end) = match (
            NaiveDate::from_ymd_opt(2025, 3, 1),
            NaiveDate::from_ymd_opt(2026, 2, 28),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => (NaiveDate::MIN, NaiveDate::MAX),
        };

        Self {
            project_name: "2025 차세대 국가대표 스포츠과학지원 사업".to_string(),
            report_year: FiscalYear(2025),
            fiscal_year_start_month: 3,
            unclassified_warning_threshold: 0.7,
            output_file_stem: "연구비_집행관리".to_string(),
            personnel_categories: vec!["인건비".to_string(), "민간이전".to_string()],
            project_period: DateRange::new(period_start, period_end),
            columns: ColumnSettings::default(),
            styling: Styling::default(),
            rules: vec![
                PrefixRuleSpec {
                    name: "사업비".to_string(),
                    prefix: "25 차세대".to_string(),
                    fund: FundType::Business,
                    default_item: None,
                },
                PrefixRuleSpec {
                    name: "연구비".to_string(),
                    prefix: "25 심층연구".to_string(),
                    fund: FundType::Research,
                    default_item: None,
                },
            ],
            taxonomy: categories,
            planned: vec![PlannedBudget {
                year: FiscalYear(2025),
                amounts: zero_budget,
            }],
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn budget_taxonomy(&self) -> Result<BudgetTaxonomy, SettingsError> {
        BudgetTaxonomy::new(&self.taxonomy, &self.planned)
    }

    /// The prefix of the first research rule, used to pull the topic out of
    /// `25 심층연구(topic)_name` descriptions.
    pub fn research_prefix(&self) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.fund == FundType::Research)
            .map(|r| r.prefix.as_str())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let taxonomy = self.budget_taxonomy()?;

        if !(1..=12).contains(&self.fiscal_year_start_month) {
            return Err(SettingsError::Invalid(format!(
                "fiscal_year_start_month must be 1-12, got {}",
                self.fiscal_year_start_month
            )));
        }
        if !(0.0..=1.0).contains(&self.unclassified_warning_threshold) {
            return Err(SettingsError::Invalid(
                "unclassified_warning_threshold must be within 0.0-1.0".to_string(),
            ));
        }
        if self.project_period.start > self.project_period.end {
            return Err(SettingsError::Invalid(
                "project_period.start is after project_period.end".to_string(),
            ));
        }
        if self.output_file_stem.trim().is_empty() {
            return Err(SettingsError::Invalid("output_file_stem is empty".to_string()));
        }
        for (name, aliases) in [
            ("date", &self.columns.date),
            ("description", &self.columns.description),
            ("amount", &self.columns.amount),
        ] {
            if aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(SettingsError::Invalid(format!(
                    "columns.{name} needs at least one header name"
                )));
            }
        }

        for rule in &self.rules {
            if rule.prefix.is_empty() {
                return Err(SettingsError::Invalid(format!(
                    "rule '{}' has an empty prefix",
                    rule.name
                )));
            }
            if rule.fund == FundType::Unclassified {
                return Err(SettingsError::Invalid(format!(
                    "rule '{}' cannot assign the unclassified fund type",
                    rule.name
                )));
            }
            if let Some(item) = &rule.default_item {
                let known = taxonomy.find(item).is_some_and(|e| e.applies_to(rule.fund));
                if !known {
                    return Err(SettingsError::UnknownDefaultItem {
                        rule: rule.name.clone(),
                        item: item.clone(),
                    });
                }
            }
        }

        for color in self.styling.colors() {
            hex_color(color)?;
        }

        Ok(())
    }
}
