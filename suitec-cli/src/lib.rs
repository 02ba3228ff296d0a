//! Command-line interface for the SuiteC background engine.
//!
//! `suitec recalculate` runs one trending-score cycle and prints its report as
//! JSON. `suitec run` starts the long-lived timer chains (trending
//! recalculation plus the daily and weekly digests) and stops on Ctrl-C.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod daemon;
mod error;
mod recalculate;

pub use error::CliError;

use daemon::RunArgs;
use recalculate::RecalculateArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_ACTIVITY_WINDOW: &str = "activity-window";
pub(crate) const ARG_COURSE: &str = "course";
pub(crate) const ARG_RECALCULATION_INTERVAL: &str = "recalculation-interval";
pub(crate) const ARG_DAILY_HOUR: &str = "daily-hour";
pub(crate) const ARG_WEEKLY_DAY: &str = "weekly-day";
pub(crate) const ARG_WEEKLY_HOUR: &str = "weekly-hour";
pub(crate) const ARG_DIGEST_OUTBOX: &str = "digest-outbox";
pub(crate) const ARG_NOTIFICATIONS: &str = "notifications";

pub(crate) const ENV_RECALCULATE_ACTIVITY_WINDOW: &str = "SUITEC_CMDS_RECALCULATE_ACTIVITY_WINDOW";
pub(crate) const ENV_RUN_ACTIVITY_WINDOW: &str = "SUITEC_CMDS_RUN_ACTIVITY_WINDOW";
pub(crate) const ENV_RUN_RECALCULATION_INTERVAL: &str = "SUITEC_CMDS_RUN_RECALCULATION_INTERVAL";
pub(crate) const ENV_RUN_DAILY_HOUR: &str = "SUITEC_CMDS_RUN_DAILY_HOUR";
pub(crate) const ENV_RUN_WEEKLY_DAY: &str = "SUITEC_CMDS_RUN_WEEKLY_DAY";
pub(crate) const ENV_RUN_WEEKLY_HOUR: &str = "SUITEC_CMDS_RUN_WEEKLY_HOUR";

pub(crate) const DEFAULT_DATABASE: &str = "suitec.db";
pub(crate) const DEFAULT_DIGEST_OUTBOX: &str = "digests.jsonl";

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG` and falls back to `info`. Records emitted through the
/// `log` facade by the library crates are forwarded to the subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("suitec: failed to initialise logging: {err}");
    }
}

/// Run the SuiteC CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    match cli.command {
        Command::Recalculate(args) => {
            let config = args.into_config()?;
            runtime.block_on(recalculate::execute(config))
        }
        Command::Run(args) => {
            let config = args.into_config()?;
            runtime.block_on(daemon::execute(config))
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "suitec",
    about = "Background jobs for the SuiteC course engagement engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recalculate trending scores once and print the report.
    Recalculate(RecalculateArgs),
    /// Run the recurring trending and digest jobs until interrupted.
    Run(RunArgs),
}

#[cfg(test)]
mod tests;
