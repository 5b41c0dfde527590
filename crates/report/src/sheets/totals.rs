use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::Worksheet;

use kiss_core::{BudgetPath, FiscalYear, FundType, TotalTable};

use crate::report::Report;
use crate::sheets::summary::merge_groups;
use crate::style::TableStyles;
use crate::ExportError;

pub const COL_ITEM: u16 = 2;
pub const COL_PLANNED: u16 = 3;
pub const COL_BUSINESS: u16 = 4;
pub const COL_RESEARCH: u16 = 5;
pub const COL_REMAINING: u16 = 6;
pub const COL_RATE: u16 = 7;

/// Where the report-year table landed, for the dashboard's formulas and
/// charts.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsLayout {
    pub year: FiscalYear,
    pub header_row: u32,
    pub first_row: u32,
    pub last_row: u32,
    pub total_row: u32,
    /// Data row of each item, in taxonomy order, with its category.
    pub items: Vec<(String, String, u32)>,
}

impl TotalsLayout {
    pub fn rows_in_categories(&self, categories: &[String]) -> Vec<u32> {
        self.items
            .iter()
            .filter(|(category, _, _)| categories.contains(category))
            .map(|(_, _, row)| *row)
            .collect()
    }
}

fn headers() -> [&'static str; 8] {
    [
        "예산목",
        "세목",
        "예산과목",
        "예산금액",
        FundType::Business.label(),
        FundType::Research.label(),
        "예산잔액",
        "집행률",
    ]
}

pub fn write(
    report: &Report<'_>,
    styles: &TableStyles,
    name: &str,
) -> Result<(Worksheet, Option<TotalsLayout>), ExportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    for (col, header) in headers().iter().enumerate() {
        sheet.set_column_width(col as u16, report.settings.styling.column_width(header))?;
    }

    let multi_year = report.totals.len() > 1;
    let mut row = 0;
    let mut layout = None;
    for table in &report.totals {
        if multi_year {
            sheet.write_string_with_format(row, 0, format!("{}년 예산", table.year), &styles.title)?;
            row += 1;
        }
        let written = write_table(&mut sheet, styles, row, table)?;
        row = written.total_row + 3;
        if table.year == report.settings.report_year {
            layout = Some(written);
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    tracing::info!("Wrote sheet '{}'", name);
    Ok((sheet, layout))
}

fn write_table(
    sheet: &mut Worksheet,
    styles: &TableStyles,
    start: u32,
    table: &TotalTable,
) -> Result<TotalsLayout, ExportError> {
    for (col, header) in headers().iter().enumerate() {
        sheet.write_string_with_format(start, col as u16, *header, &styles.header)?;
    }

    let first = start + 1;
    let mut items = Vec::with_capacity(table.rows.len());
    for (i, r) in table.rows.iter().enumerate() {
        let row = first + i as u32;
        sheet.write_string_with_format(row, COL_ITEM, &r.path.item, &styles.text)?;
        sheet.write_number_with_format(row, COL_PLANNED, r.planned.to_f64(), &styles.money)?;
        sheet.write_number_with_format(row, COL_BUSINESS, r.business.to_f64(), &styles.money)?;
        sheet.write_number_with_format(row, COL_RESEARCH, r.research.to_f64(), &styles.money)?;
        sheet.write_number_with_format(row, COL_REMAINING, r.remaining().to_f64(), &styles.money)?;
        sheet.write_number_with_format(
            row,
            COL_RATE,
            r.execution_rate().to_f64().unwrap_or_default(),
            &styles.percent,
        )?;
        items.push((r.path.category.clone(), r.path.item.clone(), row));
    }

    let paths: Vec<&BudgetPath> = table.rows.iter().map(|r| &r.path).collect();
    merge_groups(sheet, styles, first, &paths)?;

    let total = first + table.rows.len() as u32;
    sheet.merge_range(total, 0, total, COL_ITEM, "총액", &styles.total_label)?;
    sheet.write_number_with_format(total, COL_PLANNED, table.planned().to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(total, COL_BUSINESS, table.business().to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(total, COL_RESEARCH, table.research().to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(total, COL_REMAINING, table.remaining().to_f64(), &styles.total_money)?;
    sheet.write_number_with_format(
        total,
        COL_RATE,
        table.execution_rate().to_f64().unwrap_or_default(),
        &styles.total_percent,
    )?;

    Ok(TotalsLayout {
        year: table.year,
        header_row: start,
        first_row: first,
        last_row: total.saturating_sub(1).max(first),
        total_row: total,
        items,
    })
}
