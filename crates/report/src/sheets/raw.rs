use rust_xlsxwriter::Worksheet;

use kiss_core::{ClassifiedTransaction, FundType};

use crate::report::Report;
use crate::sheets::write_date;
use crate::style::TableStyles;
use crate::ExportError;

const RESEARCHER_COLUMN: &str = "연구자";

/// Line items of one fund type with the configured output columns. The
/// research sheet adds the researcher name and a blank 반영일 column.
pub fn write(
    report: &Report<'_>,
    styles: &TableStyles,
    fund: FundType,
    name: &str,
) -> Result<Worksheet, ExportError> {
    let columns = &report.settings.columns;
    let mut headers: Vec<&str> = columns.output.iter().map(String::as_str).collect();
    if fund == FundType::Research {
        headers.extend(columns.research_extra.iter().map(String::as_str));
    }

    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    for (col, header) in headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &styles.header)?;
        sheet.set_column_width(col, report.settings.styling.column_width(header))?;
    }

    let mut row = 0u32;
    for tx in report.rows_of(fund) {
        row += 1;
        for (col, header) in headers.iter().enumerate() {
            write_cell(&mut sheet, styles, report, tx, row, col as u16, header)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    if !headers.is_empty() {
        sheet.autofilter(0, 0, row, headers.len() as u16 - 1)?;
    }
    tracing::info!("Wrote sheet '{}' with {} rows", name, row);
    Ok(sheet)
}

fn write_cell(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    report: &Report<'_>,
    tx: &ClassifiedTransaction,
    row: u32,
    col: u16,
    header: &str,
) -> Result<(), ExportError> {
    let columns = &report.settings.columns;
    let named = |aliases: &[String]| aliases.iter().any(|a| a == header);
    let t = &tx.transaction;

    if named(&columns.date) {
        write_date(sheet, row, col, t.date, &styles.date)?;
    } else if named(&columns.amount) {
        sheet.write_number_with_format(row, col, t.amount.to_f64(), &styles.money)?;
    } else if named(&columns.description) {
        sheet.write_string_with_format(row, col, &t.description, &styles.text)?;
    } else if named(&columns.budget_item) {
        let item = tx
            .budget
            .as_ref()
            .map(|b| b.item.as_str())
            .or(t.budget_item.as_deref())
            .unwrap_or_default();
        sheet.write_string_with_format(row, col, item, &styles.text)?;
    } else if header == RESEARCHER_COLUMN {
        let name = report.notes.researcher(&t.description).unwrap_or_default();
        sheet.write_string_with_format(row, col, &name, &styles.text)?;
    } else {
        match t.field(header).filter(|v| !v.is_empty()) {
            Some(value) => sheet.write_string_with_format(row, col, value, &styles.text)?,
            None => sheet.write_blank(row, col, &styles.text)?,
        };
    }
    Ok(())
}
