use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "kiss",
    version,
    about = "연구비 집행관리: classify expense ledgers and build the execution report workbook"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify an expense ledger and write the report workbook.
    Process(ProcessArgs),
    /// Show sheets, columns and sample rows of an input workbook.
    Inspect(InspectArgs),
    /// Print the built-in settings as TOML.
    Config,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input workbook (.xlsx, .xlsm, .xls, .ods).
    pub input: PathBuf,

    /// Output directory. Defaults to the input file's directory.
    #[arg(short = 'o', long = "output-dir", value_name = "OUTDIR")]
    pub output_dir: Option<PathBuf>,

    /// Settings TOML overriding the built-in defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worksheet to read. Defaults to the first sheet.
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log file. Defaults to 연구비_처리.log in the output directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    pub input: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,
}
