//! Daily and weekly course activity digests.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use suitec_core::{
    ActivityConfiguration, ActivityQuery, ActivityStore, AssetScore, AssetScoreStore, BoxError,
    Course, CourseId,
};

use crate::{DigestError, ScheduledJob};

/// Number of trending assets listed in a digest.
pub const TRENDING_ASSETS_PER_DIGEST: usize = 5;

/// Period a digest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestPeriod {
    /// The last 24 hours.
    Daily,
    /// The last 7 days.
    Weekly,
}

impl DigestPeriod {
    /// Length of the covered period.
    #[must_use]
    pub fn length(self) -> TimeDelta {
        match self {
            Self::Daily => TimeDelta::days(1),
            Self::Weekly => TimeDelta::days(7),
        }
    }

    /// Report whether `course` receives this digest.
    #[must_use]
    pub const fn enabled_for(self, course: &Course) -> bool {
        course.active
            && match self {
                Self::Daily => course.daily_notifications,
                Self::Weekly => course.weekly_notifications,
            }
    }

    const fn job_name(self) -> &'static str {
        match self {
            Self::Daily => "daily digest",
            Self::Weekly => "weekly digest",
        }
    }
}

impl fmt::Display for DigestPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        })
    }
}

/// Summary of a course's activity over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDigest {
    /// Course the digest describes.
    pub course_id: CourseId,
    /// Course display name.
    pub course_name: String,
    /// Covered period.
    pub period: DigestPeriod,
    /// Exclusive start of the period.
    pub since: DateTime<Utc>,
    /// Inclusive end of the period.
    pub until: DateTime<Utc>,
    /// Number of activities per type.
    pub activity_counts: BTreeMap<String, u64>,
    /// Engagement points earned, using the course's point table.
    pub total_points: i64,
    /// Highest trending assets, best first.
    pub trending_assets: Vec<AssetScore>,
}

/// Destination for finished digests.
#[async_trait]
pub trait DigestSink: Send + Sync {
    /// Deliver one digest.
    ///
    /// # Errors
    /// Returns a [`DigestError`] when the digest cannot be delivered.
    async fn deliver(&self, digest: &CourseDigest) -> Result<(), DigestError>;
}

#[async_trait]
impl<T> DigestSink for Arc<T>
where
    T: DigestSink + ?Sized,
{
    async fn deliver(&self, digest: &CourseDigest) -> Result<(), DigestError> {
        (**self).deliver(digest).await
    }
}

/// Builds and delivers one period's digests for every eligible course.
#[derive(Debug)]
pub struct DigestJob<S, K> {
    store: Arc<S>,
    sink: K,
    activities: ActivityConfiguration,
    period: DigestPeriod,
}

impl<S, K> DigestJob<S, K>
where
    S: ActivityStore + AssetScoreStore,
    K: DigestSink,
{
    /// Create a job reading from `store` and delivering to `sink`.
    pub const fn new(
        store: Arc<S>,
        sink: K,
        activities: ActivityConfiguration,
        period: DigestPeriod,
    ) -> Self {
        Self {
            store,
            sink,
            activities,
            period,
        }
    }

    /// Period the job covers.
    #[must_use]
    pub const fn period(&self) -> DigestPeriod {
        self.period
    }

    /// Build the digest of `course` for the period ending at `until`.
    ///
    /// Returns `None` when the course had no activity in the period.
    ///
    /// # Errors
    /// Returns a [`DigestError`] when the store cannot be read.
    pub async fn build_digest(
        &self,
        course: &Course,
        until: DateTime<Utc>,
    ) -> Result<Option<CourseDigest>, DigestError> {
        let course_id = course.id;
        let since = until
            .checked_sub_signed(self.period.length())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let query = ActivityQuery::since(since)
            .until(until)
            .in_course(Some(course_id));
        let records = self
            .store
            .activities(&query)
            .await
            .map_err(|source| DigestError::ReadActivities { course_id, source })?;
        if records.is_empty() {
            debug!("No {} activity in course {course_id}", self.period);
            return Ok(None);
        }

        let overrides = self
            .store
            .activity_type_overrides(course_id)
            .await
            .map_err(|source| DigestError::ReadOverrides { course_id, source })?;
        let table = self.activities.for_course(&overrides);

        let mut activity_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_points = 0_i64;
        for record in &records {
            let count = activity_counts
                .entry(record.activity_type.clone())
                .or_default();
            *count = count.saturating_add(1);
            total_points = total_points.saturating_add(table.points(&record.activity_type));
        }

        let trending_assets = self
            .store
            .top_trending(course_id, TRENDING_ASSETS_PER_DIGEST)
            .await
            .map_err(|source| DigestError::ReadTrending { course_id, source })?;

        Ok(Some(CourseDigest {
            course_id,
            course_name: course.name.clone(),
            period: self.period,
            since,
            until,
            activity_counts,
            total_points,
            trending_assets,
        }))
    }

    /// Build and deliver digests for every eligible course.
    ///
    /// A course that fails is logged and skipped. Returns the number of
    /// digests delivered.
    ///
    /// # Errors
    /// Returns [`DigestError::ReadCourses`] when courses cannot be listed,
    /// otherwise the first per-course failure once every course was tried.
    pub async fn run_at(&self, until: DateTime<Utc>) -> Result<usize, DigestError> {
        let courses = self
            .store
            .courses()
            .await
            .map_err(|source| DigestError::ReadCourses { source })?;

        let mut delivered = 0_usize;
        let mut first_failure = None;
        for course in courses.iter().filter(|course| self.period.enabled_for(course)) {
            match self.send(course, until).await {
                Ok(true) => {
                    delivered += 1;
                    info!("Delivered {} digest for course {}", self.period, course.id);
                }
                Ok(false) => {}
                Err(err) => {
                    error!(
                        "Failed to send {} digest for course {}: {err}",
                        self.period, course.id
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }
        first_failure.map_or(Ok(delivered), Err)
    }

    async fn send(&self, course: &Course, until: DateTime<Utc>) -> Result<bool, DigestError> {
        let Some(digest) = self.build_digest(course, until).await? else {
            return Ok(false);
        };
        self.sink.deliver(&digest).await?;
        Ok(true)
    }
}

#[async_trait]
impl<S, K> ScheduledJob for DigestJob<S, K>
where
    S: ActivityStore + AssetScoreStore + 'static,
    K: DigestSink + 'static,
{
    fn name(&self) -> &str {
        self.period.job_name()
    }

    async fn run(&self) -> Result<(), BoxError> {
        self.run_at(Utc::now()).await?;
        Ok(())
    }
}
