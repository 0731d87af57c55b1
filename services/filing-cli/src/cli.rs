use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rerx_filing::config::FilingConfig;
use rerx_filing::error::AppError;
use rerx_filing::telemetry;

use crate::commands::{
    run_check_connection, run_dry_run, run_file, run_poll, run_validate,
};

#[derive(Parser, Debug)]
#[command(
    name = "RERX Filing Pipeline",
    about = "File real-estate transaction reports over SDTM and reconcile regulator responses",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, preflight, and transmit a report, creating or advancing its submission
    File(FileArgs),
    /// Check in-flight submissions for regulator responses
    Poll(PollArgs),
    /// Build and preflight a document without transmitting anything
    DryRun(DryRunArgs),
    /// Run the structural checklist against a rendered document
    Validate(ValidateArgs),
    /// Verify that the configured transport endpoint is reachable
    CheckConnection,
}

#[derive(Args, Debug)]
pub(crate) struct FileArgs {
    /// Path to the transaction report JSON produced by the intake side
    pub(crate) report: PathBuf,
    /// Directory holding the durable submission store
    #[arg(long, default_value = "./filing-store")]
    pub(crate) store: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct PollArgs {
    /// Directory holding the durable submission store
    #[arg(long, default_value = "./filing-store")]
    pub(crate) store: PathBuf,
    /// Poll a single report instead of everything that is due
    #[arg(long)]
    pub(crate) report_id: Option<String>,
    /// Upper bound on submissions processed in one run
    #[arg(long, default_value_t = 50)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct DryRunArgs {
    /// Path to the transaction report JSON
    pub(crate) report: PathBuf,
    /// Filing date override (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) filed_on: Option<NaiveDate>,
    /// Write the document here instead of printing it
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Path to a rendered document
    pub(crate) document: PathBuf,
}

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = FilingConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::File(args) => run_file(args, config),
        Command::Poll(args) => run_poll(args, config),
        Command::DryRun(args) => run_dry_run(args, config),
        Command::Validate(args) => run_validate(args, config),
        Command::CheckConnection => run_check_connection(config),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
