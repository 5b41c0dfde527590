use chrono::NaiveDate;
use std::collections::HashMap;

use kiss_core::summary::UnclassifiedSection;
use kiss_core::{
    Aggregator, BudgetTaxonomy, ClassifiedTransaction, FundType, Settings, SummaryRow,
    SummaryTable, TotalTable,
};
use kiss_import::{ClassificationWarning, ResearchNote, ResearchNoteParser, WarningReason};

/// Everything the exporter writes, computed once from the classified rows.
pub struct Report<'a> {
    pub settings: &'a Settings,
    pub taxonomy: &'a BudgetTaxonomy,
    pub transactions: &'a [ClassifiedTransaction],
    pub notes: &'a ResearchNoteParser,
    pub summary: Vec<SummaryRow>,
    pub business: Vec<SummaryTable>,
    pub research: Vec<SummaryTable>,
    pub research_groups: Vec<(ResearchNote, Vec<SummaryTable>)>,
    pub totals: Vec<TotalTable>,
    pub unclassified: UnclassifiedSection<'a>,
    reasons: HashMap<usize, &'a WarningReason>,
    pub today: NaiveDate,
}

impl<'a> Report<'a> {
    pub fn build(
        settings: &'a Settings,
        taxonomy: &'a BudgetTaxonomy,
        transactions: &'a [ClassifiedTransaction],
        warnings: &'a [ClassificationWarning],
        notes: &'a ResearchNoteParser,
        today: NaiveDate,
    ) -> Self {
        let aggregator = Aggregator::new(taxonomy, settings.report_year);
        let summary = aggregator.summarize(transactions);
        let business = aggregator.summarize_fund(transactions, FundType::Business);
        let research = aggregator.summarize_fund(transactions, FundType::Research);
        let research_groups = aggregator.summarize_groups(transactions, FundType::Research, |tx| {
            notes.parse(&tx.transaction.description)
        });
        let totals = aggregator.totals(transactions);
        let unclassified = aggregator.unclassified(transactions);
        let reasons = warnings.iter().map(|w| (w.row, &w.reason)).collect();

        tracing::info!(
            "Aggregated {} summary rows, {} research groups, {} unclassified rows",
            summary.len(),
            research_groups.len(),
            unclassified.rows.len()
        );

        Self {
            settings,
            taxonomy,
            transactions,
            notes,
            summary,
            business,
            research,
            research_groups,
            totals,
            unclassified,
            reasons,
            today,
        }
    }

    pub fn rows_of(&self, fund: FundType) -> impl Iterator<Item = &'a ClassifiedTransaction> {
        self.transactions.iter().filter(move |t| t.fund == fund)
    }

    /// Totals table for the report year; always present.
    pub fn report_year_totals(&self) -> Option<&TotalTable> {
        self.totals
            .iter()
            .find(|t| t.year == self.settings.report_year)
    }

    pub fn reason(&self, source_row: usize) -> Option<&'a WarningReason> {
        self.reasons.get(&source_row).copied()
    }
}
