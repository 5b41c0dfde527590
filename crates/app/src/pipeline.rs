use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use kiss_core::{FundType, Money, Settings, TotalTable};
use kiss_import::{
    ClassificationStats, ClassificationWarning, Classifier, DataInfo, LoadError, LoadOptions,
    ResearchNoteParser, WorkbookLoader,
};
use kiss_report::{Report, ReportExporter};

use crate::cli::{InspectArgs, ProcessArgs};

const SAMPLE_ROWS: usize = 5;
const MAX_LISTED_WARNINGS: usize = 20;

/// What a `process` run produced; printed as text or JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub sheet: String,
    pub output: PathBuf,
    pub log_file: PathBuf,
    pub sheets: Vec<String>,
    pub stats: ClassificationStats,
    pub totals: Option<TotalTable>,
    pub unclassified_amount: Money,
    pub warnings: Vec<ClassificationWarning>,
}

pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("cannot load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

/// `-o` if given, otherwise the directory holding the input file.
pub fn output_dir(args: &ProcessArgs) -> PathBuf {
    if let Some(dir) = &args.output_dir {
        return dir.clone();
    }
    match args.input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn process(
    args: &ProcessArgs,
    output_dir: &Path,
    log_file: &Path,
    today: NaiveDate,
) -> anyhow::Result<RunReport> {
    let settings = load_settings(args.config.as_deref())?;
    let taxonomy = settings
        .budget_taxonomy()
        .context("invalid budget taxonomy")?;

    // ── Load ──────────────────────────────────────────────────────────────────
    let options = LoadOptions {
        sheet: args.sheet.clone(),
    };
    let loaded = match WorkbookLoader::new(&settings.columns).load(&args.input, &options) {
        Ok(loaded) => loaded,
        Err(e) => {
            if let LoadError::MissingColumns { suggestions, .. } = &e {
                for (missing, closest) in suggestions {
                    tracing::info!("Column '{missing}' not found; closest header is '{closest}'");
                }
            }
            return Err(anyhow::Error::new(e)
                .context(format!("cannot load {}", args.input.display())));
        }
    };
    tracing::info!(
        "Loaded {} transactions from sheet '{}'",
        loaded.transactions.len(),
        loaded.sheet_name
    );

    // ── Classify ──────────────────────────────────────────────────────────────
    let outcome = Classifier::new(&settings, &taxonomy).classify(loaded.transactions);

    // ── Report ────────────────────────────────────────────────────────────────
    let notes = ResearchNoteParser::new(settings.research_prefix())
        .context("research rule prefix does not form a valid pattern")?;
    let report = Report::build(
        &settings,
        &taxonomy,
        &outcome.transactions,
        &outcome.warnings,
        &notes,
        today,
    );
    let output = output_dir.join(format!("{}.xlsx", settings.output_file_stem));
    let exported = ReportExporter::export(&report, &output)
        .with_context(|| format!("cannot write report {}", output.display()))?;

    Ok(RunReport {
        input: args.input.clone(),
        sheet: loaded.sheet_name,
        output: exported.path,
        log_file: log_file.to_path_buf(),
        sheets: exported.sheets,
        stats: outcome.stats,
        totals: report.report_year_totals().cloned(),
        unclassified_amount: report.unclassified.total,
        warnings: outcome.warnings,
    })
}

pub fn inspect(args: &InspectArgs) -> anyhow::Result<DataInfo> {
    let settings = load_settings(args.config.as_deref())?;
    let options = LoadOptions {
        sheet: args.sheet.clone(),
    };
    WorkbookLoader::new(&settings.columns)
        .inspect(&args.input, &options, SAMPLE_ROWS)
        .with_context(|| format!("cannot inspect {}", args.input.display()))
}

fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).round_dp(1))
}

pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let stats = &report.stats;
    let _ = writeln!(out, "입력: {} (시트 '{}')", report.input.display(), report.sheet);
    let _ = writeln!(out, "출력: {}", report.output.display());
    let _ = writeln!(out, "로그: {}", report.log_file.display());
    let _ = writeln!(out);
    let _ = writeln!(out, "전체 {}건", stats.total);
    for fund in [FundType::Business, FundType::Research, FundType::Unclassified] {
        let _ = writeln!(
            out,
            "  {}: {}건 ({:.1}%)",
            fund.label(),
            stats.count(fund),
            stats.percent(fund)
        );
    }
    if stats.unresolved > 0 {
        let _ = writeln!(out, "  예산과목 미확정: {}건", stats.unresolved);
    }

    if let Some(totals) = &report.totals {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}년 예산 {}", totals.year, totals.planned());
        let _ = writeln!(
            out,
            "  집행 {} (사업비 {}, 연구비 {})",
            totals.actual(),
            totals.business(),
            totals.research()
        );
        let _ = writeln!(
            out,
            "  잔액 {}, 집행률 {}",
            totals.remaining(),
            percent(totals.execution_rate())
        );
    }
    if !report.unclassified_amount.is_zero() {
        let _ = writeln!(out, "  합계 제외 금액 {}", report.unclassified_amount);
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "경고 {}건", report.warnings.len());
        for warning in report.warnings.iter().take(MAX_LISTED_WARNINGS) {
            let _ = writeln!(out, "  {warning}");
        }
        if report.warnings.len() > MAX_LISTED_WARNINGS {
            let _ = writeln!(
                out,
                "  ... 외 {}건",
                report.warnings.len() - MAX_LISTED_WARNINGS
            );
        }
    }
    out
}

pub fn render_info(info: &DataInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "파일: {}", info.path.display());
    let _ = writeln!(out, "시트: {}", info.sheet_names.join(", "));
    let _ = writeln!(out, "선택된 시트: {}", info.sheet_name);
    let _ = writeln!(out, "행 수: {}, 열 수: {}", info.row_count, info.column_count);
    let _ = writeln!(out, "열: {}", info.columns.join(", "));
    if !info.missing_columns.is_empty() {
        let _ = writeln!(out, "누락된 필수 열: {}", info.missing_columns.join(", "));
    }
    for row in &info.sample_rows {
        let _ = writeln!(out, "  {}", row.join(" | "));
    }
    out
}
