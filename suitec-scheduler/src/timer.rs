//! Self-rescheduling timer chains.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{error, info};
use suitec_core::{ActivityStore, AssetScoreStore, BoxError};
use suitec_trending::TrendingEngine;
use tokio::task::JoinHandle;

use crate::{FixedInterval, Schedule};

/// How long a chain waits before retrying when its schedule yields no fire
/// time.
const RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Work driven by a timer chain.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Label used in log lines.
    fn name(&self) -> &str;

    /// Run the job once.
    ///
    /// # Errors
    /// Any error is logged by the chain, which then reschedules.
    async fn run(&self) -> Result<(), BoxError>;
}

/// Start a chain that runs `job` whenever `schedule` says so, forever.
///
/// Each delay is computed after the previous run completes, so runs of one
/// chain never overlap. Job failures are logged and the chain re-arms.
/// Aborting the returned handle stops the chain.
pub fn spawn_timer_chain<J, S>(job: J, schedule: S) -> JoinHandle<()>
where
    J: ScheduledJob + 'static,
    S: Schedule + 'static,
{
    tokio::spawn(async move {
        let mut next = schedule.first_delay(Utc::now());
        loop {
            let delay = match next {
                Ok(delay) => delay,
                Err(err) => {
                    error!(
                        "{}: {err}; retrying in {}s",
                        job.name(),
                        RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                    next = schedule.next_delay(Utc::now());
                    continue;
                }
            };
            info!("{}: next run in {}s", job.name(), delay.as_secs());
            tokio::time::sleep(delay).await;
            if let Err(err) = job.run().await {
                error!("{} failed: {err}", job.name());
            }
            next = schedule.next_delay(Utc::now());
        }
    })
}

/// Periodic recalculation of every course's trending scores.
#[derive(Debug)]
pub struct TrendingRecalculation<S> {
    engine: Arc<TrendingEngine<S>>,
}

impl<S> TrendingRecalculation<S> {
    /// Wrap an engine so a timer chain can drive it.
    #[must_use]
    pub const fn new(engine: Arc<TrendingEngine<S>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S> ScheduledJob for TrendingRecalculation<S>
where
    S: ActivityStore + AssetScoreStore + 'static,
{
    fn name(&self) -> &str {
        "trending score recalculation"
    }

    async fn run(&self) -> Result<(), BoxError> {
        self.engine.recalculate(None).await?;
        Ok(())
    }
}

/// Start recalculating trending scores now and then every `interval`.
///
/// Each call starts an independent chain.
pub fn schedule_recalculate_trending_scores<S>(
    engine: Arc<TrendingEngine<S>>,
    interval: FixedInterval,
) -> JoinHandle<()>
where
    S: ActivityStore + AssetScoreStore + 'static,
{
    spawn_timer_chain(TrendingRecalculation::new(engine), interval)
}
