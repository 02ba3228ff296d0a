//! One-off trending recalculation.

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use suitec_core::{ActivityConfiguration, CourseId, SqliteStore};
use suitec_trending::{DEFAULT_ACTIVITY_WINDOW_HOURS, TrendingEngine, TrendingSettings};
use tracing::info;

use crate::{
    ARG_ACTIVITY_WINDOW, ARG_COURSE, ARG_DATABASE, CliError, DEFAULT_DATABASE,
    ENV_RECALCULATE_ACTIVITY_WINDOW,
};

/// CLI arguments for the `recalculate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "recalculate",
    long_about = "Recompute the trending score of every asset (or of one \
                 course's assets) from the activity recorded inside the \
                 window, write the scores that changed, and print a JSON \
                 report.",
    about = "Recalculate trending scores once"
)]
#[ortho_config(prefix = "SUITEC")]
pub(crate) struct RecalculateArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Length of the activity window in hours.
    #[arg(long = ARG_ACTIVITY_WINDOW, value_name = "hours")]
    #[serde(default)]
    pub(crate) activity_window: Option<u32>,
    /// Restrict the recalculation to one course.
    #[arg(long = ARG_COURSE, value_name = "id")]
    #[serde(default)]
    pub(crate) course: Option<CourseId>,
}

impl RecalculateArgs {
    pub(crate) fn into_config(self) -> Result<RecalculateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RecalculateConfig::try_from(merged)
    }
}

/// Resolved `recalculate` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecalculateConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) settings: TrendingSettings,
    pub(crate) course: Option<CourseId>,
}

impl TryFrom<RecalculateArgs> for RecalculateConfig {
    type Error = CliError;

    fn try_from(args: RecalculateArgs) -> Result<Self, Self::Error> {
        let hours = args
            .activity_window
            .unwrap_or(DEFAULT_ACTIVITY_WINDOW_HOURS);
        let settings = TrendingSettings::new(hours).map_err(|_| CliError::InvalidArgument {
            field: ARG_ACTIVITY_WINDOW,
            env: ENV_RECALCULATE_ACTIVITY_WINDOW,
            reason: "must be a positive number of hours",
        })?;
        Ok(Self {
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            settings,
            course: args.course,
        })
    }
}

pub(crate) async fn execute(config: RecalculateConfig) -> Result<(), CliError> {
    info!(database = %config.database, "Opening store");
    let store = Arc::new(SqliteStore::open(&config.database)?);
    let engine = TrendingEngine::new(store, ActivityConfiguration::builtin(), config.settings);
    let report = engine.recalculate(config.course).await?;
    info!(
        assets = report.assets_scored,
        updates = report.updates_applied,
        zeroed = report.zeroed,
        "Recalculation finished"
    );
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).map_err(CliError::WriteReport)?;
    writeln!(stdout).map_err(|err| CliError::WriteReport(serde_json::Error::io(err)))?;
    Ok(())
}
