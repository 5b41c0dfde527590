pub mod exporter;
pub mod report;
pub mod sheets;
pub mod style;

use std::path::PathBuf;
use thiserror::Error;

pub use exporter::{ExportSummary, ReportExporter};
pub use report::Report;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Spreadsheet generation failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output path is not writable: {}", .0.display())]
    OutputNotWritable(PathBuf),
    #[error("Invalid styling: {0}")]
    Style(#[from] kiss_core::SettingsError),
}
