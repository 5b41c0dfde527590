use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::money::Money;
use super::period::FiscalYear;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundType {
    Business,
    Research,
    Unclassified,
}

impl FundType {
    /// Korean label used in sheet headers: 센터 for business, 심층연구 for research.
    pub fn label(self) -> &'static str {
        match self {
            FundType::Business => "센터",
            FundType::Research => "심층연구",
            FundType::Unclassified => "미분류",
        }
    }
}

impl fmt::Display for FundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundType::Business => write!(f, "business"),
            FundType::Research => write!(f, "research"),
            FundType::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// One row of the input workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// 1-based row number in the source sheet, header included.
    pub source_row: usize,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Money,
    /// Raw 예산과목 value, when the input carries one.
    pub budget_item: Option<String>,
    /// Every other column of the row keyed by header, as display text.
    pub extra: BTreeMap<String, String>,
}

impl Transaction {
    pub fn fiscal_year(&self, start_month: u32, fallback: FiscalYear) -> FiscalYear {
        self.date
            .map(|d| FiscalYear::containing(d, start_month))
            .unwrap_or(fallback)
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.extra.get(column).map(String::as_str)
    }
}

/// Position of a transaction in the budget hierarchy (예산목 / 세목 / 예산과목).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BudgetPath {
    pub category: String,
    pub subcategory: String,
    pub item: String,
}

impl fmt::Display for BudgetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {} > {}", self.category, self.subcategory, self.item)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub transaction: Transaction,
    pub fund: FundType,
    /// `None` when no taxonomy entry could be resolved; such rows are left out
    /// of every category total and reported on their own.
    pub budget: Option<BudgetPath>,
    pub fiscal_year: FiscalYear,
}

impl ClassifiedTransaction {
    pub fn amount(&self) -> Money {
        self.transaction.amount
    }

    pub fn is_counted(&self) -> bool {
        self.fund != FundType::Unclassified && self.budget.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: Option<NaiveDate>) -> Transaction {
        Transaction {
            source_row: 2,
            date,
            description: "25 차세대 회의비".to_string(),
            amount: Money::from_won(1000),
            budget_item: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn fiscal_year_uses_date() {
        let t = tx(NaiveDate::from_ymd_opt(2026, 1, 10));
        assert_eq!(t.fiscal_year(3, FiscalYear(2030)), FiscalYear(2025));
    }

    #[test]
    fn fiscal_year_falls_back_without_date() {
        assert_eq!(tx(None).fiscal_year(3, FiscalYear(2025)), FiscalYear(2025));
    }

    #[test]
    fn unresolved_rows_are_not_counted() {
        let c = ClassifiedTransaction {
            transaction: tx(None),
            fund: FundType::Business,
            budget: None,
            fiscal_year: FiscalYear(2025),
        };
        assert!(!c.is_counted());
    }

    #[test]
    fn fund_labels() {
        assert_eq!(FundType::Business.label(), "센터");
        assert_eq!(FundType::Research.label(), "심층연구");
        assert_eq!(FundType::Research.to_string(), "research");
    }
}
