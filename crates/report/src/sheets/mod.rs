use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Worksheet};

use kiss_import::loader::EXCEL_YEARS;

use crate::ExportError;

pub mod dashboard;
pub mod raw;
pub mod summary;
pub mod totals;
pub mod unclassified;
pub mod yearly;

pub const DASHBOARD: &str = "대시보드";
pub const TOTALS: &str = "총액";
pub const BUSINESS_SUMMARY: &str = "사업비";
pub const RESEARCH_SUMMARY: &str = "연구비";
pub const BUSINESS_RAW: &str = "집행관리(사업비)";
pub const RESEARCH_RAW: &str = "집행관리(연구비)";
pub const UNCLASSIFIED: &str = "미분류";
pub const YEARLY: &str = "연도별예산데이터";

/// Sheet order of the output workbook.
pub const SHEET_ORDER: [&str; 8] = [
    DASHBOARD,
    TOTALS,
    BUSINESS_SUMMARY,
    RESEARCH_SUMMARY,
    BUSINESS_RAW,
    RESEARCH_RAW,
    UNCLASSIFIED,
    YEARLY,
];

/// Real Excel date cell, or a formatted blank when the row has no date.
/// Years a spreadsheet cannot hold are written as text.
pub(crate) fn write_date(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    date: Option<NaiveDate>,
    format: &Format,
) -> Result<(), ExportError> {
    match date {
        Some(d) if !EXCEL_YEARS.contains(&d.year()) => {
            tracing::warn!("Date {} outside spreadsheet range, written as text", d);
            sheet.write_string_with_format(row, col, d.format("%Y-%m-%d").to_string(), format)?;
        }
        Some(d) => {
            let value = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
            sheet.write_datetime_with_format(row, col, &value, format)?;
        }
        None => {
            sheet.write_blank(row, col, format)?;
        }
    }
    Ok(())
}
