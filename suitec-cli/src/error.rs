//! Error types emitted by the SuiteC CLI.
//!
//! Keep this error type reasonably small, as every command returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use suitec_core::SqliteStoreError;
use suitec_trending::TrendingError;
use thiserror::Error;

/// Errors emitted by the SuiteC CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A merged option holds an unusable value.
    #[error("invalid {field} (set --{field} or {env}): {reason}")]
    InvalidArgument {
        field: &'static str,
        env: &'static str,
        reason: &'static str,
    },
    /// Building the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Opening the SQLite database failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteStoreError),
    /// A one-off recalculation failed.
    #[error("trending recalculation failed: {0}")]
    Recalculate(#[from] TrendingError),
    /// Writing the recalculation report failed.
    #[error("failed to write recalculation report: {0}")]
    WriteReport(#[source] serde_json::Error),
    /// Waiting for the shutdown signal failed.
    #[error("failed to listen for shutdown signal: {0}")]
    Shutdown(#[source] std::io::Error),
}
