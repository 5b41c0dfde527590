mod cli;
mod logging;
mod pipeline;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command};
use kiss_core::Settings;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Process(args) => {
            // The log file lives in the output directory, so it has to exist
            // before the subscriber is installed.
            let output_dir = pipeline::output_dir(&args);
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("cannot create {}", output_dir.display()))?;
            let log_file = args
                .log_file
                .clone()
                .unwrap_or_else(|| output_dir.join(logging::DEFAULT_LOG_FILE));
            logging::init(args.verbose, Some(&log_file))?;

            let today = chrono::Local::now().date_naive();
            let report = pipeline::process(&args, &output_dir, &log_file, today)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", pipeline::render_text(&report));
            }
        }
        Command::Inspect(args) => {
            logging::init(0, None)?;
            let info = pipeline::inspect(&args)?;
            print!("{}", pipeline::render_info(&info));
        }
        Command::Config => {
            print!("{}", Settings::default().to_toml()?);
        }
    }
    Ok(())
}
