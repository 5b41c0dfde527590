use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use kiss_core::settings::ColumnSettings;
use kiss_core::{Money, Transaction};

use crate::util::closest_header;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Years a spreadsheet date cell can hold. Dates outside are treated as
/// unreadable so they never reach the exporter.
pub const EXCEL_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Unsupported file type '{0}': expected .xlsx, .xlsm, .xls or .ods")]
    UnsupportedExtension(String),
    #[error("Cannot read workbook: {0}")]
    Format(#[from] calamine::Error),
    #[error("Workbook has no worksheets")]
    NoWorksheet,
    #[error("Worksheet '{name}' not found (available: {})", available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },
    #[error("Worksheet '{0}' has no header row")]
    EmptySheet(String),
    #[error("Missing required columns: {} (available: {})", missing.join(", "), available.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
        /// (missing column, closest available header)
        suggestions: Vec<(String, String)>,
    },
    #[error("Row {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet to read; the first one when `None`.
    pub sheet: Option<String>,
}

impl LoadOptions {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            sheet: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub transactions: Vec<Transaction>,
}

/// Overview of an input sheet, for `kiss inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct DataInfo {
    pub path: PathBuf,
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
}

/// Header positions resolved against the configured aliases.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    description: usize,
    amount: usize,
    budget_item: Option<usize>,
}

pub struct WorkbookLoader<'a> {
    columns: &'a ColumnSettings,
}

impl<'a> WorkbookLoader<'a> {
    pub fn new(columns: &'a ColumnSettings) -> Self {
        Self { columns }
    }

    /// Reads one worksheet into transactions, in source row order.
    pub fn load(&self, path: &Path, options: &LoadOptions) -> Result<LoadedSheet, LoadError> {
        let (sheet_name, range) = open_sheet(path, options)?;
        tracing::info!(
            "Reading sheet '{}' of {} ({} rows)",
            sheet_name,
            path.display(),
            range.height()
        );
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        self.from_rows(&sheet_name, first_row, &rows)
    }

    pub fn inspect(
        &self,
        path: &Path,
        options: &LoadOptions,
        sample: usize,
    ) -> Result<DataInfo, LoadError> {
        check_path(path)?;
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        let sheet_name = select_sheet(&sheet_names, options)?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(cell_text).collect())
            .unwrap_or_default();
        let data: Vec<Vec<String>> = rows
            .filter(|r| !is_blank(r))
            .map(|r| r.iter().map(cell_text).collect())
            .collect();
        let missing_columns = match self.resolve_columns(&columns) {
            Ok(_) => Vec::new(),
            Err(LoadError::MissingColumns { missing, .. }) => missing,
            Err(other) => return Err(other),
        };

        Ok(DataInfo {
            path: path.to_path_buf(),
            sheet_names,
            sheet_name,
            row_count: data.len(),
            column_count: columns.len(),
            columns,
            missing_columns,
            sample_rows: data.into_iter().take(sample).collect(),
        })
    }

    /// Converts raw cells to transactions. The first row is the header;
    /// `first_row` is its zero-based position in the sheet.
    pub fn from_rows(
        &self,
        sheet_name: &str,
        first_row: usize,
        rows: &[Vec<Data>],
    ) -> Result<LoadedSheet, LoadError> {
        let Some((header, body)) = rows.split_first() else {
            return Err(LoadError::EmptySheet(sheet_name.to_string()));
        };
        let headers: Vec<String> = header.iter().map(cell_text).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(LoadError::EmptySheet(sheet_name.to_string()));
        }
        let index = self.resolve_columns(&headers)?;

        let mut transactions = Vec::with_capacity(body.len());
        for (offset, row) in body.iter().enumerate() {
            if is_blank(row) {
                continue;
            }
            // header is row first_row + 1 in 1-based numbering
            let source_row = first_row + offset + 2;
            transactions.push(to_transaction(&headers, index, row, source_row)?);
        }

        tracing::info!(
            "Loaded {} transactions from sheet '{}'",
            transactions.len(),
            sheet_name
        );
        Ok(LoadedSheet {
            sheet_name: sheet_name.to_string(),
            headers,
            transactions,
        })
    }

    fn resolve_columns(&self, headers: &[String]) -> Result<ColumnIndex, LoadError> {
        let find = |aliases: &[String]| {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias))
        };

        let mut missing = Vec::new();
        let mut suggestions = Vec::new();
        let mut require = |aliases: &[String]| {
            let found = find(aliases);
            if found.is_none() {
                let name = aliases.first().cloned().unwrap_or_default();
                if let Some(closest) = aliases.iter().find_map(|a| closest_header(a, headers)) {
                    suggestions.push((name.clone(), closest.to_string()));
                }
                missing.push(name);
            }
            found
        };

        let date = require(&self.columns.date);
        let description = require(&self.columns.description);
        let amount = require(&self.columns.amount);

        match (date, description, amount) {
            (Some(date), Some(description), Some(amount)) => Ok(ColumnIndex {
                date,
                description,
                amount,
                budget_item: find(&self.columns.budget_item),
            }),
            _ => Err(LoadError::MissingColumns {
                missing,
                available: headers.iter().filter(|h| !h.is_empty()).cloned().collect(),
                suggestions,
            }),
        }
    }
}

fn check_path(path: &Path) -> Result<(), LoadError> {
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LoadError::UnsupportedExtension(extension));
    }
    Ok(())
}

fn select_sheet(sheet_names: &[String], options: &LoadOptions) -> Result<String, LoadError> {
    match &options.sheet {
        Some(name) if sheet_names.contains(name) => Ok(name.clone()),
        Some(name) => Err(LoadError::SheetNotFound {
            name: name.clone(),
            available: sheet_names.to_vec(),
        }),
        None => sheet_names.first().cloned().ok_or(LoadError::NoWorksheet),
    }
}

fn open_sheet(path: &Path, options: &LoadOptions) -> Result<(String, Range<Data>), LoadError> {
    check_path(path)?;
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = select_sheet(&workbook.sheet_names(), options)?;
    let range = workbook.worksheet_range(&sheet_name)?;
    Ok((sheet_name, range))
}

fn to_transaction(
    headers: &[String],
    index: ColumnIndex,
    row: &[Data],
    source_row: usize,
) -> Result<Transaction, LoadError> {
    let cell = |col: usize| row.get(col).unwrap_or(&Data::Empty);

    let date = cell_date(cell(index.date));
    if date.is_none() && !is_blank(std::slice::from_ref(cell(index.date))) {
        tracing::warn!(
            "Row {}: unreadable date '{}', counted in the report year",
            source_row,
            cell_text(cell(index.date))
        );
    }
    let amount = cell_amount(cell(index.amount)).ok_or_else(|| LoadError::InvalidAmount {
        row: source_row,
        value: cell_text(cell(index.amount)),
    })?;
    let budget_item = index
        .budget_item
        .map(|col| cell_text(cell(col)))
        .filter(|s| !s.is_empty());

    let used = [Some(index.date), Some(index.description), Some(index.amount), index.budget_item];
    let extra: BTreeMap<String, String> = headers
        .iter()
        .enumerate()
        .filter(|(col, header)| !header.is_empty() && !used.contains(&Some(*col)))
        .map(|(col, header)| (header.clone(), cell_text(cell(col))))
        .collect();

    Ok(Transaction {
        source_row,
        date,
        description: cell_text(cell(index.description)),
        amount,
        budget_item,
        extra,
    })
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| match c {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

/// Display text of a cell. Whole floats print without a fraction and
/// date cells as `YYYY-MM-DD`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.trim().to_string(),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => excel_serial_to_date(v.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| v.to_string()),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

pub fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(v) => excel_serial_to_date(v.as_f64()),
        Data::Float(v) => excel_serial_to_date(*v),
        Data::Int(v) => excel_serial_to_date(*v as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date(s),
        _ => None,
    }
}

/// Empty cells count as zero; anything unreadable is `None`.
pub fn cell_amount(cell: &Data) -> Option<Money> {
    match cell {
        Data::Empty => Some(Money::zero()),
        Data::Float(v) if v.is_finite() => Money::from_f64(*v),
        Data::Int(v) => Some(Money::from_won(*v)),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Excel's 1900 date system. Serial 1 is 1900-01-01 and serial 60 is the
/// nonexistent 1900-02-29, so serials from 61 on count from 1899-12-30.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let base = match days {
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    base.checked_add_signed(Duration::days(days))
}

/// Text date in one of the accepted layouts, within [`EXCEL_YEARS`].
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_date_text(s).filter(|d| EXCEL_YEARS.contains(&d.year()))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // drop any time part: "2025-03-04 10:00:00", "2025-03-04T10:00:00"
    let s = s.split([' ', 'T']).next().unwrap_or(s).trim_end_matches('.');

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Accepts `1,234`, `₩1,234`, `1234원`, `-500` and accounting `(500)`.
/// Empty text is zero.
pub fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '₩' | '원' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return if negative { None } else { Some(Money::zero()) };
    }
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    let money = Money::from_decimal(value);
    Some(if negative { -money } else { money })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnSettings {
        ColumnSettings::default()
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn header() -> Vec<Data> {
        ["결의서", "발의일자", "번호", "적요", "작성자", "총지급액", "예산과목"]
            .iter()
            .map(|h| s(h))
            .collect()
    }

    #[test]
    fn reads_rows_in_order_and_skips_blank_rows() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![
            header(),
            vec![
                s("R-1"),
                Data::Float(45717.0),
                Data::Int(1),
                s("25 차세대 회의비"),
                s("홍길동"),
                Data::Float(100000.0),
                s("회의비"),
            ],
            vec![Data::Empty; 7],
            vec![
                s("R-2"),
                s("2025.03.05"),
                Data::Int(2),
                s("기타"),
                s(""),
                s("5,000"),
                Data::Empty,
            ],
        ];
        let sheet = loader.from_rows("Sheet1", 0, &rows).unwrap();
        assert_eq!(sheet.transactions.len(), 2);

        let first = &sheet.transactions[0];
        assert_eq!(first.source_row, 2);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(first.amount, Money::from_won(100_000));
        assert_eq!(first.budget_item.as_deref(), Some("회의비"));
        assert_eq!(first.field("결의서"), Some("R-1"));
        assert_eq!(first.field("번호"), Some("1"));
        assert_eq!(first.field("적요"), None);

        let second = &sheet.transactions[1];
        assert_eq!(second.source_row, 4);
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(second.amount, Money::from_won(5_000));
        assert_eq!(second.budget_item, None);
    }

    #[test]
    fn source_rows_account_for_sheet_offset() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![
            header(),
            vec![s("R"), Data::Empty, Data::Empty, s("x"), s(""), Data::Int(1), s("")],
        ];
        let sheet = loader.from_rows("Sheet1", 2, &rows).unwrap();
        assert_eq!(sheet.transactions[0].source_row, 4);
        assert_eq!(sheet.transactions[0].date, None);
    }

    #[test]
    fn amount_alias_is_accepted() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![
            vec![s("발의일자"), s("적요"), s("지출액")],
            vec![s("2025-04-01"), s("25 심층연구(AI)_김철수"), Data::Float(1234.5)],
        ];
        let sheet = loader.from_rows("Sheet1", 0, &rows).unwrap();
        let tx = &sheet.transactions[0];
        assert_eq!(tx.amount, Money::from_decimal(Decimal::new(12345, 1)));
        assert!(tx.extra.is_empty());
    }

    #[test]
    fn missing_columns_are_reported_with_suggestions() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![vec![s("발의 일자"), s("적요"), s("비고")]];
        match loader.from_rows("Sheet1", 0, &rows) {
            Err(LoadError::MissingColumns {
                missing,
                available,
                suggestions,
            }) => {
                assert_eq!(missing, vec!["발의일자".to_string(), "총지급액".to_string()]);
                assert_eq!(available.len(), 3);
                assert_eq!(
                    suggestions,
                    vec![("발의일자".to_string(), "발의 일자".to_string())]
                );
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn empty_sheet_is_an_error() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        assert!(matches!(
            loader.from_rows("빈시트", 0, &[]),
            Err(LoadError::EmptySheet(name)) if name == "빈시트"
        ));
    }

    #[test]
    fn invalid_amount_names_the_row() {
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![
            vec![s("발의일자"), s("적요"), s("총지급액")],
            vec![Data::Empty, s("25 차세대"), s("abc")],
        ];
        assert!(matches!(
            loader.from_rows("Sheet1", 0, &rows),
            Err(LoadError::InvalidAmount { row: 2, value }) if value == "abc"
        ));
    }

    #[test]
    fn parses_amount_text() {
        assert_eq!(parse_amount("1,234"), Some(Money::from_won(1234)));
        assert_eq!(parse_amount("₩1,234"), Some(Money::from_won(1234)));
        assert_eq!(parse_amount("5000원"), Some(Money::from_won(5000)));
        assert_eq!(parse_amount("(500)"), Some(Money::from_won(-500)));
        assert_eq!(parse_amount("-500"), Some(Money::from_won(-500)));
        assert_eq!(parse_amount(""), Some(Money::zero()));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn parses_date_text() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 4);
        assert_eq!(parse_date("2025-03-04"), expected);
        assert_eq!(parse_date("2025.03.04"), expected);
        assert_eq!(parse_date("2025/03/04"), expected);
        assert_eq!(parse_date("20250304"), expected);
        assert_eq!(parse_date("2025-03-04 13:45:00"), expected);
        assert_eq!(parse_date("2025-03-04T13:45:00"), expected);
        assert_eq!(parse_date("어제"), None);
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(45717.0), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(excel_serial_to_date(45717.75), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn early_serials_skip_phantom_leap_day() {
        assert_eq!(excel_serial_to_date(1.0), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(excel_serial_to_date(59.0), NaiveDate::from_ymd_opt(1900, 2, 28));
        assert_eq!(excel_serial_to_date(60.0), None);
        assert_eq!(excel_serial_to_date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1));
    }

    #[test]
    fn dates_outside_spreadsheet_years_are_unreadable() {
        assert_eq!(parse_date("0205.03.04"), None);
        assert_eq!(parse_date("1899-12-31"), None);
        assert_eq!(parse_date("9999-12-31"), NaiveDate::from_ymd_opt(9999, 12, 31));

        let cols = columns();
        let loader = WorkbookLoader::new(&cols);
        let rows = vec![
            header(),
            vec![
                s("R-1"),
                s("0205.03.04"),
                Data::Int(1),
                s("25 차세대 회의비"),
                s("홍길동"),
                Data::Float(100000.0),
                s("회의비"),
            ],
        ];
        let sheet = loader.from_rows("Sheet1", 0, &rows).unwrap();
        assert_eq!(sheet.transactions.len(), 1);
        assert_eq!(sheet.transactions[0].date, None);
        assert_eq!(sheet.transactions[0].amount, Money::from_won(100_000));
    }

    #[test]
    fn cell_text_formats_whole_floats() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&s("  적요 ")), "적요");
    }

    #[test]
    fn rejects_missing_file_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cols = columns();
        let loader = WorkbookLoader::new(&cols);

        let missing = dir.path().join("없음.xlsx");
        assert!(matches!(
            loader.load(&missing, &LoadOptions::default()),
            Err(LoadError::FileNotFound(_))
        ));

        let csv = dir.path().join("data.csv");
        std::fs::write(&csv, "a,b\n").unwrap();
        assert!(matches!(
            loader.load(&csv, &LoadOptions::default()),
            Err(LoadError::UnsupportedExtension(ext)) if ext == "csv"
        ));
    }
}
