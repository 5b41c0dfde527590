use std::path::Path;

use kiss_core::{FundType, Money, Settings};
use kiss_import::{Classifier, LoadError, LoadOptions, WarningReason, WorkbookLoader};
use rust_xlsxwriter::Workbook;

fn write_input(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("지출내역").unwrap();
    let headers = ["결의서", "발의일자", "번호", "적요", "작성자", "총지급액", "예산과목"];
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *h).unwrap();
    }
    let rows: [(&str, &str, &str, f64, &str); 3] = [
        ("R-1", "2025-03-10", "25 차세대 사업비", 100_000.0, "회의비"),
        ("R-2", "2025-04-02", "25 심층연구(스포츠영양)_김철수 자문", 250_000.0, "연구개발비"),
        ("R-3", "2025-05-20", "기타", 5_000.0, ""),
    ];
    for (i, (id, date, desc, amount, item)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *id).unwrap();
        sheet.write_string(row, 1, *date).unwrap();
        sheet.write_number(row, 2, row as f64).unwrap();
        sheet.write_string(row, 3, *desc).unwrap();
        sheet.write_string(row, 4, "담당자").unwrap();
        sheet.write_number(row, 5, *amount).unwrap();
        if !item.is_empty() {
            sheet.write_string(row, 6, *item).unwrap();
        }
    }
    let other = workbook.add_worksheet();
    other.set_name("메모").unwrap();
    other.write_string(0, 0, "비고").unwrap();
    workbook.save(path).unwrap();
}

#[test]
fn loads_and_classifies_a_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.xlsx");
    write_input(&path);

    let settings = Settings::default();
    let loader = WorkbookLoader::new(&settings.columns);
    let sheet = loader.load(&path, &LoadOptions::default()).unwrap();
    assert_eq!(sheet.sheet_name, "지출내역");
    assert_eq!(sheet.transactions.len(), 3);
    assert_eq!(sheet.transactions[0].amount, Money::from_won(100_000));

    let taxonomy = settings.budget_taxonomy().unwrap();
    let outcome = Classifier::new(&settings, &taxonomy).classify(sheet.transactions);
    let funds: Vec<FundType> = outcome.transactions.iter().map(|t| t.fund).collect();
    assert_eq!(
        funds,
        vec![FundType::Business, FundType::Research, FundType::Unclassified]
    );
    assert_eq!(
        outcome.transactions[1].budget.as_ref().unwrap().item,
        "연구개발비"
    );
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].row, 4);
    assert_eq!(outcome.warnings[0].reason, WarningReason::NoMatchingRule);
}

#[test]
fn selects_a_named_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.xlsx");
    write_input(&path);

    let settings = Settings::default();
    let loader = WorkbookLoader::new(&settings.columns);
    match loader.load(&path, &LoadOptions::sheet("메모")) {
        Err(LoadError::MissingColumns { missing, .. }) => assert_eq!(missing.len(), 3),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    match loader.load(&path, &LoadOptions::sheet("없는시트")) {
        Err(LoadError::SheetNotFound { available, .. }) => {
            assert_eq!(available, vec!["지출내역".to_string(), "메모".to_string()])
        }
        other => panic!("expected SheetNotFound, got {other:?}"),
    }
}

#[test]
fn inspect_reports_columns_and_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.xlsx");
    write_input(&path);

    let settings = Settings::default();
    let info = WorkbookLoader::new(&settings.columns)
        .inspect(&path, &LoadOptions::default(), 2)
        .unwrap();
    assert_eq!(info.row_count, 3);
    assert_eq!(info.column_count, 7);
    assert_eq!(info.columns[3], "적요");
    assert!(info.missing_columns.is_empty());
    assert_eq!(info.sample_rows.len(), 2);
    assert_eq!(info.sample_rows[0][5], "100000");
}

#[test]
fn corrupt_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip archive").unwrap();

    let settings = Settings::default();
    let loader = WorkbookLoader::new(&settings.columns);
    assert!(matches!(
        loader.load(&path, &LoadOptions::default()),
        Err(LoadError::Format(_))
    ));
}
