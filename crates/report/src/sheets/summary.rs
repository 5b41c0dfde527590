use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::Worksheet;

use kiss_core::{BudgetPath, FiscalYear, SummaryRow, SummaryTable};

use crate::report::Report;
use crate::style::TableStyles;
use crate::ExportError;

pub const HEADERS: [&str; 7] = ["예산목", "세목", "예산과목", "예산금액", "지출액", "예산잔액", "집행률"];

/// Blank rows between the tables of the research sheet.
const TABLE_GAP: u32 = 2;

pub fn write_business(
    report: &Report<'_>,
    styles: &TableStyles,
    name: &str,
) -> Result<Worksheet, ExportError> {
    let mut sheet = new_sheet(report, name)?;
    let mut row = 0;
    let multi_year = report.business.len() > 1;
    for table in &report.business {
        if multi_year {
            row = write_title(&mut sheet, styles, row, &year_title(table.year))?;
        }
        row = write_table(&mut sheet, styles, row, table)? + TABLE_GAP;
    }
    tracing::info!("Wrote sheet '{}'", name);
    Ok(sheet)
}

/// 총합 table for all research rows, then one table per (topic, researcher).
pub fn write_research(
    report: &Report<'_>,
    styles: &TableStyles,
    name: &str,
) -> Result<Worksheet, ExportError> {
    let mut sheet = new_sheet(report, name)?;
    let mut row = 0;
    let multi_year = report.research.len() > 1;

    for table in &report.research {
        let title = if multi_year {
            format!("총합 ({})", table.year)
        } else {
            "총합".to_string()
        };
        row = write_title(&mut sheet, styles, row, &title)?;
        row = write_table(&mut sheet, styles, row, table)? + TABLE_GAP;
    }

    for (note, tables) in &report.research_groups {
        for table in tables {
            let title = if tables.len() > 1 {
                format!("{} ({})", note.title(), table.year)
            } else {
                note.title()
            };
            row = write_title(&mut sheet, styles, row, &title)?;
            row = write_table(&mut sheet, styles, row, table)? + TABLE_GAP;
        }
    }

    tracing::info!(
        "Wrote sheet '{}' with {} researcher tables",
        name,
        report.research_groups.len()
    );
    Ok(sheet)
}

fn new_sheet(report: &Report<'_>, name: &str) -> Result<Worksheet, ExportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.set_column_width(col as u16, report.settings.styling.column_width(header))?;
    }
    Ok(sheet)
}

fn year_title(year: FiscalYear) -> String {
    format!("{year}년 예산")
}

fn write_title(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    row: u32,
    title: &str,
) -> Result<u32, ExportError> {
    sheet.write_string_with_format(row, 0, title, &styles.title)?;
    Ok(row + 1)
}

/// Writes header, rows and total starting at `start`; returns the first
/// row after the table.
pub(crate) fn write_table(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    start: u32,
    table: &SummaryTable,
) -> Result<u32, ExportError> {
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(start, col as u16, *header, &styles.header)?;
    }

    let first = start + 1;
    for (i, r) in table.rows.iter().enumerate() {
        let row = first + i as u32;
        sheet.write_string_with_format(row, 2, &r.path.item, &styles.text)?;
        write_amounts(sheet, styles, row, r)?;
    }
    let paths: Vec<&BudgetPath> = table.rows.iter().map(|r| &r.path).collect();
    merge_groups(sheet, styles, first, &paths)?;

    let total = first + table.rows.len() as u32;
    sheet.merge_range(total, 0, total, 2, "합계", &styles.total_label)?;
    sheet.write_number_with_format(total, 3, table.total.planned.to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(total, 4, table.total.actual.to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(total, 5, table.total.remaining.to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(
        total,
        6,
        table.total.execution_rate.to_f64().unwrap_or_default(),
        &styles.total_percent,
    )?;
    Ok(total + 1)
}

fn write_amounts(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    row: u32,
    r: &SummaryRow,
) -> Result<(), ExportError> {
    sheet.write_number_with_format(row, 3, r.planned.to_f64(), &styles.money)?;
    sheet.write_number_with_format(row, 4, r.actual.to_f64(), &styles.money)?;
    sheet.write_number_with_format(row, 5, r.remaining.to_f64(), &styles.money)?;
    sheet.write_number_with_format(
        row,
        6,
        r.execution_rate.to_f64().unwrap_or_default(),
        &styles.percent,
    )?;
    Ok(())
}

/// Merges runs of equal category (column 0) and subcategory (column 1)
/// values so each group name appears once.
pub(crate) fn merge_groups(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    first: u32,
    paths: &[&BudgetPath],
) -> Result<(), ExportError> {
    let categories: Vec<&str> = paths.iter().map(|p| p.category.as_str()).collect();
    // subcategory runs never cross a category boundary
    let subcategories: Vec<(&str, &str)> = paths
        .iter()
        .map(|p| (p.category.as_str(), p.subcategory.as_str()))
        .collect();

    for (s, e) in runs(&categories) {
        merge_cells(sheet, styles, first + s as u32, first + e as u32, 0, categories[s])?;
    }
    for (s, e) in runs(&subcategories) {
        merge_cells(sheet, styles, first + s as u32, first + e as u32, 1, subcategories[s].1)?;
    }
    Ok(())
}

pub(crate) fn merge_cells(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    top: u32,
    bottom: u32,
    col: u16,
    text: &str,
) -> Result<(), ExportError> {
    if top == bottom {
        sheet.write_string_with_format(top, col, text, &styles.group)?;
    } else {
        sheet.merge_range(top, col, bottom, col, text, &styles.group)?;
    }
    Ok(())
}

/// Inclusive `(start, end)` index pairs of consecutive equal values.
pub(crate) fn runs<T: PartialEq>(values: &[T]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=values.len() {
        if i == values.len() || values[i] != values[start] {
            if start < values.len() {
                out.push((start, i - 1));
            }
            start = i;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_groups_consecutive_values() {
        assert_eq!(runs(&["a", "a", "b", "c", "c", "c"]), vec![(0, 1), (2, 2), (3, 5)]);
        assert_eq!(runs::<&str>(&[]), vec![]);
        assert_eq!(runs(&["x"]), vec![(0, 0)]);
    }

    #[test]
    fn runs_do_not_merge_separated_values() {
        assert_eq!(runs(&[1, 2, 1]), vec![(0, 0), (1, 1), (2, 2)]);
    }
}
