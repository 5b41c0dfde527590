use serde::Serialize;
use std::fmt;

use kiss_core::settings::PrefixRuleSpec;
use kiss_core::taxonomy::TaxonomyEntry;
use kiss_core::{BudgetTaxonomy, ClassifiedTransaction, FiscalYear, FundType, Settings, Transaction};

/// Why a row did not land in a category total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WarningReason {
    /// The description starts with no registered prefix.
    NoMatchingRule,
    /// The 예산과목 value names no taxonomy item for the row's fund.
    UnknownBudgetItem(String),
    /// Neither the row nor its rule names a budget item.
    MissingBudgetItem,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningReason::NoMatchingRule => write!(f, "분류 규칙 없음"),
            WarningReason::UnknownBudgetItem(item) => write!(f, "알 수 없는 예산과목: {item}"),
            WarningReason::MissingBudgetItem => write!(f, "예산과목 없음"),
        }
    }
}

/// Non-fatal: the row is kept, reported on the 미분류 sheet and left out of
/// every category total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationWarning {
    pub row: usize,
    pub description: String,
    pub reason: WarningReason,
}

impl fmt::Display for ClassificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {} ({})", self.row, self.reason, self.description)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub total: usize,
    pub business: usize,
    pub research: usize,
    pub unclassified: usize,
    /// Rows with a fund type but no resolvable budget item.
    pub unresolved: usize,
}

impl ClassificationStats {
    pub fn count(&self, fund: FundType) -> usize {
        match fund {
            FundType::Business => self.business,
            FundType::Research => self.research,
            FundType::Unclassified => self.unclassified,
        }
    }

    /// Share of rows with the given fund type, in percent.
    pub fn percent(&self, fund: FundType) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(fund) as f64 * 100.0 / self.total as f64
    }

    pub fn unclassified_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.unclassified as f64 / self.total as f64
    }

    fn record(&mut self, tx: &ClassifiedTransaction) {
        self.total += 1;
        match tx.fund {
            FundType::Business => self.business += 1,
            FundType::Research => self.research += 1,
            FundType::Unclassified => self.unclassified += 1,
        }
        if tx.fund != FundType::Unclassified && tx.budget.is_none() {
            self.unresolved += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    /// Same length and order as the input.
    pub transactions: Vec<ClassifiedTransaction>,
    pub warnings: Vec<ClassificationWarning>,
    pub stats: ClassificationStats,
}

/// Ordered prefix rules; the first rule whose prefix starts the description
/// wins.
pub struct PrefixRuleEngine {
    rules: Vec<PrefixRuleSpec>,
}

impl PrefixRuleEngine {
    pub fn new(rules: Vec<PrefixRuleSpec>) -> Self {
        Self { rules }
    }

    pub fn find_matching_rule(&self, description: &str) -> Option<&PrefixRuleSpec> {
        self.rules
            .iter()
            .find(|rule| !rule.prefix.is_empty() && description.starts_with(&rule.prefix))
    }

    /// All rules whose prefix matches, in evaluation order. More than one
    /// means the configured prefixes overlap.
    pub fn matching_rules<'a>(&'a self, description: &'a str) -> impl Iterator<Item = &'a PrefixRuleSpec> {
        self.rules
            .iter()
            .filter(move |rule| !rule.prefix.is_empty() && description.starts_with(&rule.prefix))
    }
}

/// Assigns a fund type and a budget path to every row. Pure: holds only
/// read-only configuration.
pub struct Classifier<'a> {
    engine: PrefixRuleEngine,
    taxonomy: &'a BudgetTaxonomy,
    fiscal_year_start_month: u32,
    report_year: FiscalYear,
    unclassified_warning_threshold: f64,
}

impl<'a> Classifier<'a> {
    pub fn new(settings: &Settings, taxonomy: &'a BudgetTaxonomy) -> Self {
        Self {
            engine: PrefixRuleEngine::new(settings.rules.clone()),
            taxonomy,
            fiscal_year_start_month: settings.fiscal_year_start_month,
            report_year: settings.report_year,
            unclassified_warning_threshold: settings.unclassified_warning_threshold,
        }
    }

    pub fn classify(&self, transactions: Vec<Transaction>) -> ClassificationOutcome {
        tracing::info!("Classifying {} transactions", transactions.len());

        let mut stats = ClassificationStats::default();
        let mut warnings = Vec::new();
        let classified: Vec<ClassifiedTransaction> = transactions
            .into_iter()
            .map(|tx| {
                let (classified, warning) = self.classify_one(tx);
                stats.record(&classified);
                if let Some(warning) = warning {
                    tracing::warn!("Classification warning at {}", warning);
                    warnings.push(warning);
                }
                classified
            })
            .collect();

        tracing::info!(
            "Classified: business {} ({:.1}%), research {} ({:.1}%), unclassified {} ({:.1}%)",
            stats.business,
            stats.percent(FundType::Business),
            stats.research,
            stats.percent(FundType::Research),
            stats.unclassified,
            stats.percent(FundType::Unclassified),
        );
        if stats.total > 0 && stats.unclassified_ratio() > self.unclassified_warning_threshold {
            tracing::warn!(
                "{:.1}% of rows match no prefix rule; check the description column and prefixes",
                stats.unclassified_ratio() * 100.0
            );
        }

        ClassificationOutcome {
            transactions: classified,
            warnings,
            stats,
        }
    }

    pub fn classify_one(
        &self,
        transaction: Transaction,
    ) -> (ClassifiedTransaction, Option<ClassificationWarning>) {
        let fiscal_year =
            transaction.fiscal_year(self.fiscal_year_start_month, self.report_year);

        let Some(rule) = self.engine.find_matching_rule(&transaction.description) else {
            let warning = ClassificationWarning {
                row: transaction.source_row,
                description: transaction.description.clone(),
                reason: WarningReason::NoMatchingRule,
            };
            let classified = ClassifiedTransaction {
                transaction,
                fund: FundType::Unclassified,
                budget: None,
                fiscal_year,
            };
            return (classified, Some(warning));
        };

        if self.engine.matching_rules(&transaction.description).nth(1).is_some() {
            tracing::debug!(
                "Row {} matches several prefixes; '{}' applied",
                transaction.source_row,
                rule.name
            );
        }

        let (budget, warning) = match self.resolve_item(&transaction, rule) {
            Ok(entry) => {
                tracing::debug!(
                    "Row {} -> {} / {}",
                    transaction.source_row,
                    rule.fund,
                    entry.path
                );
                (Some(entry.path.clone()), None)
            }
            Err(reason) => (
                None,
                Some(ClassificationWarning {
                    row: transaction.source_row,
                    description: transaction.description.clone(),
                    reason,
                }),
            ),
        };

        let classified = ClassifiedTransaction {
            transaction,
            fund: rule.fund,
            budget,
            fiscal_year,
        };
        (classified, warning)
    }

    /// Budget item for a row already assigned to `rule.fund`: the exact
    /// 예산과목 value, then a keyword match on that value, then a keyword
    /// inside the description, then the rule's default item.
    fn resolve_item(
        &self,
        tx: &Transaction,
        rule: &PrefixRuleSpec,
    ) -> Result<&'a TaxonomyEntry, WarningReason> {
        let fund = rule.fund;
        let index = self.taxonomy.keyword_index(fund);
        let lookup = |text: &str| -> Option<&'a TaxonomyEntry> {
            let text = text.to_lowercase();
            index
                .iter()
                .find(|(keyword, _)| text.contains(&keyword.to_lowercase()))
                .map(|(_, entry)| *entry)
        };

        let mut unknown = None;
        if let Some(value) = tx.budget_item.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            if let Some(entry) = self.taxonomy.find(value).filter(|e| e.applies_to(fund)) {
                return Ok(entry);
            }
            if let Some(entry) = lookup(value) {
                return Ok(entry);
            }
            // "고용부담금" for "일용직 고용부담금"
            if value.chars().count() >= 2 {
                if let Some((_, entry)) = index.iter().find(|(keyword, _)| keyword.contains(value)) {
                    return Ok(*entry);
                }
            }
            unknown = Some(value.to_string());
        }

        let description = tx
            .description
            .strip_prefix(rule.prefix.as_str())
            .unwrap_or(&tx.description);
        if let Some(entry) = lookup(description) {
            return Ok(entry);
        }

        if let Some(entry) = rule
            .default_item
            .as_deref()
            .and_then(|item| self.taxonomy.find(item))
            .filter(|e| e.applies_to(fund))
        {
            return Ok(entry);
        }

        Err(match unknown {
            Some(value) => WarningReason::UnknownBudgetItem(value),
            None => WarningReason::MissingBudgetItem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiss_core::Money;
    use std::collections::BTreeMap;

    fn tx(description: &str, budget_item: Option<&str>, won: i64) -> Transaction {
        Transaction {
            source_row: 2,
            date: chrono::NaiveDate::from_ymd_opt(2025, 5, 1),
            description: description.to_string(),
            amount: Money::from_won(won),
            budget_item: budget_item.map(str::to_string),
            extra: BTreeMap::new(),
        }
    }

    fn rule(name: &str, prefix: &str, fund: FundType) -> PrefixRuleSpec {
        PrefixRuleSpec {
            name: name.to_string(),
            prefix: prefix.to_string(),
            fund,
            default_item: None,
        }
    }

    fn classify_with(settings: &Settings, rows: Vec<Transaction>) -> ClassificationOutcome {
        let taxonomy = settings.budget_taxonomy().unwrap();
        Classifier::new(settings, &taxonomy).classify(rows)
    }

    #[test]
    fn first_matching_prefix_wins() {
        let engine = PrefixRuleEngine::new(vec![
            rule("short", "25", FundType::Business),
            rule("long", "25 심층연구", FundType::Research),
        ]);
        let hit = engine.find_matching_rule("25 심층연구 회의").unwrap();
        assert_eq!(hit.name, "short");
        assert_eq!(engine.matching_rules("25 심층연구 회의").count(), 2);
        assert!(engine.find_matching_rule("기타").is_none());
    }

    #[test]
    fn prefix_must_start_the_description() {
        let engine = PrefixRuleEngine::new(vec![rule("b", "25 차세대", FundType::Business)]);
        assert!(engine.find_matching_rule("비고 25 차세대").is_none());
        assert!(engine.find_matching_rule(" 25 차세대").is_none());
    }

    #[test]
    fn business_row_resolves_item_from_budget_column() {
        let settings = Settings::default();
        let outcome = classify_with(
            &settings,
            vec![tx("25 차세대 사업비", Some("회의비"), 100_000)],
        );
        let row = &outcome.transactions[0];
        assert_eq!(row.fund, FundType::Business);
        let path = row.budget.as_ref().unwrap();
        assert_eq!(path.category, "업무추진비");
        assert_eq!(path.item, "회의비");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn business_row_without_budget_column_stays_out_of_totals() {
        let settings = Settings::default();
        let outcome = classify_with(&settings, vec![tx("25 차세대 사업비", None, 100_000)]);
        let row = &outcome.transactions[0];
        assert_eq!(row.fund, FundType::Business);
        assert!(row.budget.is_none());
        assert!(!row.is_counted());
        assert_eq!(outcome.warnings[0].reason, WarningReason::MissingBudgetItem);
        assert_eq!(outcome.stats.business, 1);
        assert_eq!(outcome.stats.unresolved, 1);

        let mut with_default = Settings::default();
        with_default.rules[0].default_item = Some("사업추진비".to_string());
        let outcome = classify_with(&with_default, vec![tx("25 차세대 사업비", None, 100_000)]);
        assert_eq!(outcome.transactions[0].budget.as_ref().unwrap().item, "사업추진비");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn unmatched_row_is_unclassified_with_warning() {
        let settings = Settings::default();
        let outcome = classify_with(&settings, vec![tx("기타", None, 5_000)]);
        let row = &outcome.transactions[0];
        assert_eq!(row.fund, FundType::Unclassified);
        assert!(row.budget.is_none());
        assert_eq!(outcome.warnings[0].reason, WarningReason::NoMatchingRule);
        assert_eq!(outcome.stats.unclassified, 1);
    }

    #[test]
    fn partial_budget_value_matches_longest_item() {
        let settings = Settings::default();
        let outcome = classify_with(
            &settings,
            vec![
                tx("25 차세대 복리", Some("운영비/급여성복리후생비(일용직)"), 1),
                tx("25 차세대 부담금", Some("고용부담금"), 1),
            ],
        );
        assert_eq!(
            outcome.transactions[0].budget.as_ref().unwrap().item,
            "급여성복리후생비(일용직)"
        );
        assert_eq!(
            outcome.transactions[1].budget.as_ref().unwrap().item,
            "일용직 고용부담금"
        );
    }

    #[test]
    fn description_keyword_is_used_without_budget_column() {
        let settings = Settings::default();
        let outcome = classify_with(
            &settings,
            vec![tx("25 심층연구(AI)_김철수 기자재 구입", None, 300_000)],
        );
        let row = &outcome.transactions[0];
        assert_eq!(row.fund, FundType::Research);
        assert_eq!(row.budget.as_ref().unwrap().item, "자산취득비");
    }

    #[test]
    fn research_only_items_are_skipped_for_business_rows() {
        let settings = Settings::default();
        let outcome = classify_with(&settings, vec![tx("25 차세대 연구개발 자문", None, 10)]);
        let row = &outcome.transactions[0];
        assert_eq!(row.fund, FundType::Business);
        assert!(row.budget.is_none());
        assert_eq!(outcome.warnings[0].reason, WarningReason::MissingBudgetItem);
        assert_eq!(outcome.stats.unresolved, 1);
    }

    #[test]
    fn unknown_budget_value_is_reported() {
        let settings = Settings::default();
        let outcome = classify_with(&settings, vec![tx("25 차세대 잡비", Some("잡비"), 10)]);
        assert_eq!(
            outcome.warnings[0].reason,
            WarningReason::UnknownBudgetItem("잡비".to_string())
        );
    }

    #[test]
    fn default_item_applies_last() {
        let mut settings = Settings::default();
        settings.rules[0].default_item = Some("일반용역비".to_string());
        let outcome = classify_with(
            &settings,
            vec![
                tx("25 차세대 사업비", None, 1),
                tx("25 차세대 회의비", None, 1),
            ],
        );
        assert_eq!(outcome.transactions[0].budget.as_ref().unwrap().item, "일반용역비");
        assert_eq!(outcome.transactions[1].budget.as_ref().unwrap().item, "회의비");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn output_keeps_input_length_and_order() {
        let settings = Settings::default();
        let rows: Vec<Transaction> = (0..5)
            .map(|i| {
                let mut t = tx(if i % 2 == 0 { "25 차세대 회의비" } else { "기타" }, None, i);
                t.source_row = i as usize + 2;
                t
            })
            .collect();
        let outcome = classify_with(&settings, rows);
        assert_eq!(outcome.transactions.len(), 5);
        for (i, row) in outcome.transactions.iter().enumerate() {
            assert_eq!(row.transaction.source_row, i + 2);
        }
        assert_eq!(outcome.stats.total, 5);
        assert_eq!(outcome.stats.business, 3);
        assert_eq!(outcome.stats.unclassified, 2);
        assert!((outcome.stats.percent(FundType::Business) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn classification_is_deterministic() {
        let settings = Settings::default();
        let rows = vec![
            tx("25 차세대 통신비", None, 1),
            tx("25 심층연구 연구비", None, 2),
            tx("기타", None, 3),
        ];
        let a = classify_with(&settings, rows.clone());
        let b = classify_with(&settings, rows);
        assert_eq!(a.transactions, b.transactions);
        assert_eq!(a.warnings, b.warnings);
    }

    #[test]
    fn fiscal_year_falls_back_to_report_year() {
        let settings = Settings::default();
        let mut row = tx("25 차세대 회의비", None, 1);
        row.date = None;
        let outcome = classify_with(&settings, vec![row]);
        assert_eq!(outcome.transactions[0].fiscal_year, FiscalYear(2025));
    }
}
