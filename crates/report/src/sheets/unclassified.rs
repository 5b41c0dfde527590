use rust_xlsxwriter::Worksheet;

use crate::report::Report;
use crate::sheets::write_date;
use crate::style::TableStyles;
use crate::ExportError;

const HEADERS: [&str; 6] = ["행", "발의일자", "적요", "총지급액", "구분", "사유"];

/// Rows left out of every category total, with the reason and their sum.
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
        let width = match *header {
            "행" => 8.0,
            other => report.settings.styling.column_width(other),
        };
        sheet.set_column_width(col, width)?;
    }

    let section = &report.unclassified;
    for (i, tx) in section.rows.iter().enumerate() {
        let row = i as u32 + 1;
        let t = &tx.transaction;
        sheet.write_number_with_format(row, 0, t.source_row as f64, &styles.text)?;
        write_date(&mut sheet, row, 1, t.date, &styles.date)?;
        sheet.write_string_with_format(row, 2, &t.description, &styles.text)?;
        sheet.write_number_with_format(row, 3, t.amount.to_f64(), &styles.money)?;
        sheet.write_string_with_format(row, 4, tx.fund.label(), &styles.text)?;
        let reason = report
            .reason(t.source_row)
            .map(|r| r.to_string())
            .unwrap_or_default();
        sheet.write_string_with_format(row, 5, reason, &styles.text)?;
    }

    let total = section.rows.len() as u32 + 1;
    sheet.merge_range(total, 0, total, 2, "합계", &styles.total_label)?;
    sheet.write_number_with_format(total, 3, section.total.to_f64(), &styles.total_money)?;
    sheet.write_blank(total, 4, &styles.total_label)?;
    sheet.write_blank(total, 5, &styles.total_label)?;
    sheet.set_freeze_panes(1, 0)?;

    if !section.rows.is_empty() {
        tracing::warn!(
            "{} rows ({}) left out of category totals; see sheet '{}'",
            section.rows.len(),
            section.total,
            name
        );
    }
    Ok(sheet)
}
