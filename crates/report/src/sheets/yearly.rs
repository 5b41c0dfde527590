use rust_xlsxwriter::{Chart, ChartType, Worksheet};

use crate::report::Report;
use crate::style::TableStyles;
use crate::ExportError;

const HEADERS: [&str; 5] = ["연도", "예산목", "세목", "예산과목", "예산금액"];
const SUMMARY_COL: u16 = 6;

/// Long table of every configured planned figure (year, item, amount), a
/// per-year total table beside it and a column chart over those totals.
pub fn write(
    report: &Report<'_>,
    styles: &TableStyles,
    name: &str,
) -> Result<Worksheet, ExportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    for (col, header) in HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &styles.header)?;
        sheet.set_column_width(col, report.settings.styling.column_width(header))?;
    }

    let history = report.taxonomy.planned_history();
    for (i, (year, entry, amount)) in history.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number_with_format(row, 0, f64::from(year.year()), &styles.text)?;
        sheet.write_string_with_format(row, 1, &entry.path.category, &styles.text)?;
        sheet.write_string_with_format(row, 2, &entry.path.subcategory, &styles.text)?;
        sheet.write_string_with_format(row, 3, &entry.path.item, &styles.text)?;
        sheet.write_number_with_format(row, 4, amount.to_f64(), &styles.money)?;
    }
    if !history.is_empty() {
        sheet.autofilter(0, 0, history.len() as u32, HEADERS.len() as u16 - 1)?;
    }

    let years = report.taxonomy.planned_years();
    sheet.write_string_with_format(0, SUMMARY_COL, "연도", &styles.header)?;
    sheet.write_string_with_format(0, SUMMARY_COL + 1, "총 예산", &styles.header)?;
    sheet.set_column_width(SUMMARY_COL + 1, 16.0)?;
    for (i, year) in years.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string_with_format(row, SUMMARY_COL, year.to_string(), &styles.text)?;
        sheet.write_number_with_format(
            row,
            SUMMARY_COL + 1,
            report.taxonomy.planned_total(*year).to_f64(),
            &styles.money,
        )?;
    }

    if !years.is_empty() {
        let last = years.len() as u32;
        let mut chart = Chart::new(ChartType::Column);
        chart
            .add_series()
            .set_categories((name, 1, SUMMARY_COL, last, SUMMARY_COL))
            .set_values((name, 1, SUMMARY_COL + 1, last, SUMMARY_COL + 1))
            .set_name("총 예산");
        chart.title().set_name("연도별 예산 비교");
        chart.legend().set_hidden();
        sheet.insert_chart(years.len() as u32 + 3, SUMMARY_COL, &chart)?;
    }

    tracing::info!(
        "Wrote sheet '{}' with {} planned figures over {} years",
        name,
        history.len(),
        years.len()
    );
    Ok(sheet)
}
