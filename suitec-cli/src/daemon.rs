//! The long-running `run` command.

use std::str::FromStr;
use std::sync::Arc;

use camino::Utf8PathBuf;
use chrono::Weekday;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use suitec_core::{ActivityConfiguration, SqliteStore};
use suitec_scheduler::{
    DailyAt, DigestJob, DigestPeriod, FixedInterval, JsonLinesDigestSink, WeeklyAt,
    schedule_recalculate_trending_scores, spawn_timer_chain,
};
use suitec_trending::{DEFAULT_ACTIVITY_WINDOW_HOURS, TrendingEngine, TrendingSettings};
use tracing::info;

use crate::{
    ARG_ACTIVITY_WINDOW, ARG_DAILY_HOUR, ARG_DATABASE, ARG_DIGEST_OUTBOX, ARG_NOTIFICATIONS,
    ARG_RECALCULATION_INTERVAL, ARG_WEEKLY_DAY, ARG_WEEKLY_HOUR, CliError, DEFAULT_DATABASE,
    DEFAULT_DIGEST_OUTBOX, ENV_RUN_ACTIVITY_WINDOW, ENV_RUN_DAILY_HOUR,
    ENV_RUN_RECALCULATION_INTERVAL, ENV_RUN_WEEKLY_DAY, ENV_RUN_WEEKLY_HOUR,
};

const DEFAULT_RECALCULATION_INTERVAL_MINUTES: u32 = 5;
const DEFAULT_DIGEST_HOUR: u32 = 8;
const HOUR_REASON: &str = "must be an hour between 0 and 23";

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "run",
    long_about = "Start the recurring jobs: trending recalculation every \
                 interval, plus the daily and weekly activity digests at \
                 fixed local times. Runs until interrupted with Ctrl-C.",
    about = "Run the recurring background jobs"
)]
#[ortho_config(prefix = "SUITEC")]
pub(crate) struct RunArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Length of the activity window in hours.
    #[arg(long = ARG_ACTIVITY_WINDOW, value_name = "hours")]
    #[serde(default)]
    pub(crate) activity_window: Option<u32>,
    /// Minutes between trending recalculations.
    #[arg(long = ARG_RECALCULATION_INTERVAL, value_name = "minutes")]
    #[serde(default)]
    pub(crate) recalculation_interval: Option<u32>,
    /// Local hour at which the daily digest is sent.
    #[arg(long = ARG_DAILY_HOUR, value_name = "hour")]
    #[serde(default)]
    pub(crate) daily_hour: Option<u32>,
    /// Day of the week on which the weekly digest is sent (e.g. `mon`).
    #[arg(long = ARG_WEEKLY_DAY, value_name = "day")]
    #[serde(default)]
    pub(crate) weekly_day: Option<String>,
    /// Local hour at which the weekly digest is sent.
    #[arg(long = ARG_WEEKLY_HOUR, value_name = "hour")]
    #[serde(default)]
    pub(crate) weekly_hour: Option<u32>,
    /// JSON-lines file that receives the digests.
    #[arg(long = ARG_DIGEST_OUTBOX, value_name = "path")]
    #[serde(default)]
    pub(crate) digest_outbox: Option<Utf8PathBuf>,
    /// Whether the digest jobs run at all.
    #[arg(long = ARG_NOTIFICATIONS, value_name = "bool")]
    #[serde(default)]
    pub(crate) notifications: Option<bool>,
}

impl RunArgs {
    pub(crate) fn into_config(self) -> Result<RunConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RunConfig::try_from(merged)
    }
}

/// Resolved `run` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) settings: TrendingSettings,
    pub(crate) interval: FixedInterval,
    pub(crate) daily: DailyAt,
    pub(crate) weekly: WeeklyAt,
    pub(crate) digest_outbox: Utf8PathBuf,
    pub(crate) notifications: bool,
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = CliError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let settings = TrendingSettings::new(
            args.activity_window
                .unwrap_or(DEFAULT_ACTIVITY_WINDOW_HOURS),
        )
        .map_err(|_| CliError::InvalidArgument {
            field: ARG_ACTIVITY_WINDOW,
            env: ENV_RUN_ACTIVITY_WINDOW,
            reason: "must be a positive number of hours",
        })?;
        let interval = FixedInterval::minutes(
            args.recalculation_interval
                .unwrap_or(DEFAULT_RECALCULATION_INTERVAL_MINUTES),
        )
        .map_err(|_| CliError::InvalidArgument {
            field: ARG_RECALCULATION_INTERVAL,
            env: ENV_RUN_RECALCULATION_INTERVAL,
            reason: "must be a positive number of minutes",
        })?;
        let daily = DailyAt::new(args.daily_hour.unwrap_or(DEFAULT_DIGEST_HOUR)).map_err(|_| {
            CliError::InvalidArgument {
                field: ARG_DAILY_HOUR,
                env: ENV_RUN_DAILY_HOUR,
                reason: HOUR_REASON,
            }
        })?;
        let weekday = match args.weekly_day.as_deref() {
            Some(day) => Weekday::from_str(day).map_err(|_| CliError::InvalidArgument {
                field: ARG_WEEKLY_DAY,
                env: ENV_RUN_WEEKLY_DAY,
                reason: "must be a day of the week such as `mon`",
            })?,
            None => Weekday::Mon,
        };
        let weekly = WeeklyAt::new(weekday, args.weekly_hour.unwrap_or(DEFAULT_DIGEST_HOUR))
            .map_err(|_| CliError::InvalidArgument {
                field: ARG_WEEKLY_HOUR,
                env: ENV_RUN_WEEKLY_HOUR,
                reason: HOUR_REASON,
            })?;
        Ok(Self {
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            settings,
            interval,
            daily,
            weekly,
            digest_outbox: args
                .digest_outbox
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DIGEST_OUTBOX)),
            notifications: args.notifications.unwrap_or(true),
        })
    }
}

pub(crate) async fn execute(config: RunConfig) -> Result<(), CliError> {
    info!(database = %config.database, "Opening store");
    let store = Arc::new(SqliteStore::open(&config.database)?);
    let activities = ActivityConfiguration::builtin();
    let engine = Arc::new(TrendingEngine::new(
        Arc::clone(&store),
        activities.clone(),
        config.settings,
    ));

    let mut chains = vec![schedule_recalculate_trending_scores(
        engine,
        config.interval,
    )];
    if config.notifications {
        info!(outbox = %config.digest_outbox, "Digest jobs enabled");
        let sink = Arc::new(JsonLinesDigestSink::new(config.digest_outbox));
        chains.push(spawn_timer_chain(
            DigestJob::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                activities.clone(),
                DigestPeriod::Daily,
            ),
            config.daily,
        ));
        chains.push(spawn_timer_chain(
            DigestJob::new(store, sink, activities, DigestPeriod::Weekly),
            config.weekly,
        ));
    } else {
        info!("Digest jobs disabled");
    }

    info!("SuiteC engine running; press Ctrl-C to stop");
    let outcome = tokio::signal::ctrl_c().await.map_err(CliError::Shutdown);
    for chain in &chains {
        chain.abort();
    }
    info!("SuiteC engine stopped");
    outcome
}
