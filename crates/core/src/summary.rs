use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::money::Money;
use super::period::FiscalYear;
use super::taxonomy::{BudgetTaxonomy, TaxonomyEntry};
use super::transaction::{BudgetPath, ClassifiedTransaction, FundType};

/// actual / planned, defined as zero when nothing was planned.
pub fn execution_rate(actual: Money, planned: Money) -> Decimal {
    actual.ratio_of(planned)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub path: BudgetPath,
    pub year: FiscalYear,
    pub planned: Money,
    pub actual: Money,
    pub execution_rate: Decimal,
    pub remaining: Money,
}

impl SummaryRow {
    fn new(path: BudgetPath, year: FiscalYear, planned: Money, actual: Money) -> Self {
        Self {
            path,
            year,
            planned,
            actual,
            execution_rate: execution_rate(actual, planned),
            remaining: planned - actual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotal {
    pub planned: Money,
    pub actual: Money,
    pub execution_rate: Decimal,
    pub remaining: Money,
}

impl SummaryTotal {
    fn of(rows: &[SummaryRow]) -> Self {
        let planned: Money = rows.iter().map(|r| r.planned).sum();
        let actual: Money = rows.iter().map(|r| r.actual).sum();
        Self {
            planned,
            actual,
            execution_rate: execution_rate(actual, planned),
            remaining: planned - actual,
        }
    }
}

/// One budget year of a summary: every applicable taxonomy entry in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub year: FiscalYear,
    pub rows: Vec<SummaryRow>,
    pub total: SummaryTotal,
}

/// Totals-sheet row: actual spend split between business (센터) and research
/// (심층연구).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalRow {
    pub path: BudgetPath,
    pub year: FiscalYear,
    pub planned: Money,
    pub business: Money,
    pub research: Money,
}

impl TotalRow {
    pub fn actual(&self) -> Money {
        self.business + self.research
    }

    pub fn remaining(&self) -> Money {
        self.planned - self.actual()
    }

    pub fn execution_rate(&self) -> Decimal {
        execution_rate(self.actual(), self.planned)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalTable {
    pub year: FiscalYear,
    pub rows: Vec<TotalRow>,
}

impl TotalTable {
    pub fn planned(&self) -> Money {
        self.rows.iter().map(|r| r.planned).sum()
    }

    pub fn business(&self) -> Money {
        self.rows.iter().map(|r| r.business).sum()
    }

    pub fn research(&self) -> Money {
        self.rows.iter().map(|r| r.research).sum()
    }

    pub fn actual(&self) -> Money {
        self.business() + self.research()
    }

    pub fn remaining(&self) -> Money {
        self.planned() - self.actual()
    }

    pub fn execution_rate(&self) -> Decimal {
        execution_rate(self.actual(), self.planned())
    }

    /// Execution rate with the given categories left out of both sides.
    pub fn execution_rate_excluding(&self, categories: &[String]) -> Decimal {
        let kept = self
            .rows
            .iter()
            .filter(|r| !categories.contains(&r.path.category));
        let (planned, actual) = kept.fold((Money::zero(), Money::zero()), |(p, a), r| {
            (p + r.planned, a + r.actual())
        });
        execution_rate(actual, planned)
    }
}

/// Rows excluded from every category total, with their amount.
#[derive(Debug, Clone, PartialEq)]
pub struct UnclassifiedSection<'a> {
    pub rows: Vec<&'a ClassifiedTransaction>,
    pub total: Money,
}

/// Groups classified rows by taxonomy entry and budget year. Pure: the same
/// input always yields the same tables, in taxonomy order.
pub struct Aggregator<'a> {
    taxonomy: &'a BudgetTaxonomy,
    report_year: FiscalYear,
}

impl<'a> Aggregator<'a> {
    pub fn new(taxonomy: &'a BudgetTaxonomy, report_year: FiscalYear) -> Self {
        Self {
            taxonomy,
            report_year,
        }
    }

    /// Report year plus every year a counted transaction falls in.
    pub fn years(&self, transactions: &[ClassifiedTransaction]) -> BTreeSet<FiscalYear> {
        let mut years: BTreeSet<FiscalYear> = transactions
            .iter()
            .filter(|t| t.is_counted())
            .map(|t| t.fiscal_year)
            .collect();
        years.insert(self.report_year);
        years
    }

    /// One row per (entry, year) across all fund types, sorted by taxonomy
    /// order and then year.
    pub fn summarize(&self, transactions: &[ClassifiedTransaction]) -> Vec<SummaryRow> {
        let actuals = self.actuals(transactions.iter());
        let years = self.years(transactions);
        let mut rows = Vec::with_capacity(self.taxonomy.len() * years.len());
        for (idx, entry) in self.taxonomy.entries().iter().enumerate() {
            for year in &years {
                rows.push(self.row(entry, *year, actual_of(&actuals, idx, *year)));
            }
        }
        rows
    }

    /// Summary tables for one fund type: entries that apply to the fund,
    /// one table per budget year.
    pub fn summarize_fund(
        &self,
        transactions: &[ClassifiedTransaction],
        fund: FundType,
    ) -> Vec<SummaryTable> {
        let rows: Vec<&ClassifiedTransaction> =
            transactions.iter().filter(|t| t.fund == fund).collect();
        self.tables_for(&rows, fund)
    }

    /// Summary tables per key (e.g. research topic and researcher) within a
    /// fund. Rows for which `key` returns `None` are left out of every group.
    pub fn summarize_groups<K, F>(
        &self,
        transactions: &[ClassifiedTransaction],
        fund: FundType,
        key: F,
    ) -> Vec<(K, Vec<SummaryTable>)>
    where
        K: Ord + Clone,
        F: Fn(&ClassifiedTransaction) -> Option<K>,
    {
        let mut groups: BTreeMap<K, Vec<&ClassifiedTransaction>> = BTreeMap::new();
        for tx in transactions.iter().filter(|t| t.fund == fund) {
            if let Some(k) = key(tx) {
                groups.entry(k).or_default().push(tx);
            }
        }
        groups
            .into_iter()
            .map(|(k, rows)| {
                let tables = self.tables_for(&rows, fund);
                (k, tables)
            })
            .collect()
    }

    /// Totals tables across fund types, one per budget year.
    pub fn totals(&self, transactions: &[ClassifiedTransaction]) -> Vec<TotalTable> {
        let business = self.actuals(
            transactions
                .iter()
                .filter(|t| t.fund == FundType::Business),
        );
        let research = self.actuals(
            transactions
                .iter()
                .filter(|t| t.fund == FundType::Research),
        );
        self.years(transactions)
            .into_iter()
            .map(|year| TotalTable {
                year,
                rows: self
                    .taxonomy
                    .entries()
                    .iter()
                    .enumerate()
                    .map(|(idx, entry)| TotalRow {
                        path: entry.path.clone(),
                        year,
                        planned: self.taxonomy.planned(&entry.path.item, year),
                        business: actual_of(&business, idx, year),
                        research: actual_of(&research, idx, year),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn unclassified<'t>(
        &self,
        transactions: &'t [ClassifiedTransaction],
    ) -> UnclassifiedSection<'t> {
        let rows: Vec<&ClassifiedTransaction> =
            transactions.iter().filter(|t| !t.is_counted()).collect();
        let total = rows.iter().map(|t| t.amount()).sum();
        UnclassifiedSection { rows, total }
    }

    fn tables_for(&self, rows: &[&ClassifiedTransaction], fund: FundType) -> Vec<SummaryTable> {
        let actuals = self.actuals(rows.iter().copied());
        let mut years: BTreeSet<FiscalYear> = rows
            .iter()
            .filter(|t| t.is_counted())
            .map(|t| t.fiscal_year)
            .collect();
        years.insert(self.report_year);

        years
            .into_iter()
            .map(|year| {
                let rows: Vec<SummaryRow> = self
                    .taxonomy
                    .entries()
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.applies_to(fund))
                    .map(|(idx, e)| self.row(e, year, actual_of(&actuals, idx, year)))
                    .collect();
                let total = SummaryTotal::of(&rows);
                SummaryTable { year, rows, total }
            })
            .collect()
    }

    fn row(&self, entry: &TaxonomyEntry, year: FiscalYear, actual: Money) -> SummaryRow {
        let planned = self.taxonomy.planned(&entry.path.item, year);
        SummaryRow::new(entry.path.clone(), year, planned, actual)
    }

    fn actuals<'t, I>(&self, transactions: I) -> BTreeMap<(usize, FiscalYear), Money>
    where
        I: Iterator<Item = &'t ClassifiedTransaction>,
    {
        let mut sums = BTreeMap::new();
        for tx in transactions.filter(|t| t.is_counted()) {
            let idx = tx
                .budget
                .as_ref()
                .filter(|path| self.taxonomy.contains(path))
                .and_then(|path| self.taxonomy.position(&path.item));
            match idx {
                Some(idx) => *sums.entry((idx, tx.fiscal_year)).or_insert_with(Money::zero) += tx.amount(),
                None => tracing::warn!(
                    "Row {} carries a budget path outside the taxonomy; left out of totals",
                    tx.transaction.source_row
                ),
            }
        }
        sums
    }
}

fn actual_of(sums: &BTreeMap<(usize, FiscalYear), Money>, idx: usize, year: FiscalYear) -> Money {
    sums.get(&(idx, year)).copied().unwrap_or_default()
}
