//! Recalculation cycle over the store collaborators.
#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};
use suitec_core::{
    ActivityConfiguration, ActivityQuery, ActivityStore, AssetId, AssetScoreStore, CourseId,
    StoreError,
};

use crate::{RecalculationReport, TrendingError, TrendingSettings, aggregate_impact, reconcile_scores};

/// Recalculates and persists trending scores.
///
/// The engine is stateless between cycles: every call reads the window
/// afresh and writes only what changed.
#[derive(Debug)]
pub struct TrendingEngine<S> {
    store: Arc<S>,
    activities: ActivityConfiguration,
    settings: TrendingSettings,
}

impl<S> TrendingEngine<S>
where
    S: ActivityStore + AssetScoreStore,
{
    /// Create an engine reading and writing through `store`.
    pub const fn new(
        store: Arc<S>,
        activities: ActivityConfiguration,
        settings: TrendingSettings,
    ) -> Self {
        Self {
            store,
            activities,
            settings,
        }
    }

    /// Settings the engine was built with.
    #[must_use]
    pub const fn settings(&self) -> &TrendingSettings {
        &self.settings
    }

    /// Store the engine operates on.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Recalculate scores for one course, or every course when `course_id`
    /// is `None`, using the current time.
    ///
    /// # Errors
    /// See [`TrendingEngine::recalculate_at`].
    pub async fn recalculate(
        &self,
        course_id: Option<CourseId>,
    ) -> Result<RecalculationReport, TrendingError> {
        self.recalculate_at(course_id, Utc::now()).await
    }

    /// Recalculate scores as of `now`.
    ///
    /// Writes are applied one at a time. A failed write is logged and the
    /// batch carries on; the first failure is returned once every write was
    /// attempted.
    ///
    /// # Errors
    /// Returns [`TrendingError::UnknownCourse`] when `course_id` names no
    /// course, a read error when the store cannot be queried (no writes are
    /// issued then), or [`TrendingError::UpdateScore`] when any write fails.
    pub async fn recalculate_at(
        &self,
        course_id: Option<CourseId>,
        now: DateTime<Utc>,
    ) -> Result<RecalculationReport, TrendingError> {
        if let Some(id) = course_id {
            self.require_course(id).await?;
        }
        let window_start = self.settings.window_start(now);
        match course_id {
            Some(id) => info!("Recalculating trending scores for course {id} since {window_start}"),
            None => info!("Recalculating trending scores for all courses since {window_start}"),
        }

        let query = ActivityQuery::since(window_start).in_course(course_id);
        let records = self
            .store
            .asset_activities(&query)
            .await
            .map_err(|source| TrendingError::ReadActivities { source })?;
        let aggregated = aggregate_impact(&records, &self.activities);

        let persisted = self
            .store
            .nonzero_trending_scores(course_id)
            .await
            .map_err(|source| TrendingError::ReadScores { source })?;
        let updates = reconcile_scores(&aggregated, &persisted);

        let mut report = RecalculationReport {
            course_id,
            window_start,
            assets_scored: aggregated.len(),
            updates_applied: 0,
            zeroed: 0,
        };
        let mut first_failure: Option<(AssetId, StoreError)> = None;
        let mut failed = 0_usize;
        for (asset_id, score) in updates.iter() {
            match self.store.set_trending_score(asset_id, score).await {
                Ok(()) => {
                    report.updates_applied += 1;
                    if score == 0 {
                        report.zeroed += 1;
                    }
                }
                Err(source) => {
                    error!("Failed to update trending score of asset {asset_id}: {source}");
                    failed += 1;
                    first_failure.get_or_insert((asset_id, source));
                }
            }
        }

        info!(
            "Trending scores recalculated: {} asset(s) scored, {} update(s) applied, {} zeroed",
            report.assets_scored, report.updates_applied, report.zeroed
        );
        match first_failure {
            Some((asset_id, source)) => Err(TrendingError::UpdateScore {
                asset_id,
                failed,
                source,
            }),
            None => Ok(report),
        }
    }

    async fn require_course(&self, course_id: CourseId) -> Result<(), TrendingError> {
        let course = self
            .store
            .course(course_id)
            .await
            .map_err(|source| TrendingError::ReadCourse { course_id, source })?;
        if course.is_none() {
            return Err(TrendingError::UnknownCourse { course_id });
        }
        Ok(())
    }
}
