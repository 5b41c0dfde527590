use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::path::{Path, PathBuf};

use kiss_core::FundType;

use crate::report::Report;
use crate::sheets::{self, dashboard, raw, summary, totals, unclassified, yearly};
use crate::style::TableStyles;
use crate::ExportError;

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub sheets: Vec<String>,
    pub business_rows: usize,
    pub research_rows: usize,
    pub unclassified_rows: usize,
}

/// Writes the whole workbook in one go. A failure part-way may leave no
/// file or a truncated one.
pub struct ReportExporter;

impl ReportExporter {
    pub fn export(report: &Report<'_>, path: &Path) -> Result<ExportSummary, ExportError> {
        check_writable(path)?;
        tracing::info!("Writing report to {}", path.display());

        let styles = TableStyles::new(&report.settings.styling)?;
        let (totals_sheet, layout) = totals::write(report, &styles, sheets::TOTALS)?;

        let ordered: Vec<Worksheet> = vec![
            dashboard::write(report, layout.as_ref(), sheets::DASHBOARD, sheets::TOTALS)?,
            totals_sheet,
            summary::write_business(report, &styles, sheets::BUSINESS_SUMMARY)?,
            summary::write_research(report, &styles, sheets::RESEARCH_SUMMARY)?,
            raw::write(report, &styles, FundType::Business, sheets::BUSINESS_RAW)?,
            raw::write(report, &styles, FundType::Research, sheets::RESEARCH_RAW)?,
            unclassified::write(report, &styles, sheets::UNCLASSIFIED)?,
            yearly::write(report, &styles, sheets::YEARLY)?,
        ];

        let mut workbook = Workbook::new();
        for sheet in ordered {
            workbook.push_worksheet(sheet);
        }
        workbook.save(path)?;

        let summary = ExportSummary {
            path: path.to_path_buf(),
            sheets: sheets::SHEET_ORDER.iter().map(|s| s.to_string()).collect(),
            business_rows: report.rows_of(FundType::Business).count(),
            research_rows: report.rows_of(FundType::Research).count(),
            unclassified_rows: report.unclassified.rows.len(),
        };
        tracing::info!("Saved {} ({} sheets)", path.display(), summary.sheets.len());
        Ok(summary)
    }
}

fn check_writable(path: &Path) -> Result<(), ExportError> {
    if path.is_dir() {
        return Err(ExportError::OutputNotWritable(path.to_path_buf()));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ExportError::OutputNotWritable(path.to_path_buf()))
        }
        _ => Ok(()),
    }
}
