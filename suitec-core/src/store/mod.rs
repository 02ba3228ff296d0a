//! Persistence collaborators consumed by the background jobs.
//!
//! [`ActivityStore`] answers read-only questions about courses and recorded
//! activity. [`AssetScoreStore`] reads and writes the persisted trending score
//! of assets. Both traits are asynchronous and object-safe so callers can hold
//! implementations behind `Arc`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{ActivityRecord, ActivityTypeOverride, AssetId, AssetScore, Course, CourseId};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Boxed error carried by store backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed while performing an operation.
    #[error("failed to {operation}")]
    Backend {
        /// Description of the failed operation.
        operation: &'static str,
        /// Error reported by the backend.
        #[source]
        source: BoxError,
    },
    /// A persisted identifier could not be represented as `u64`.
    #[error("{kind} id {id} is outside the supported range")]
    IdOutOfRange {
        /// Kind of identifier, e.g. `"asset"`.
        kind: &'static str,
        /// Raw value read from the backend.
        id: i64,
    },
    /// An identifier exceeds what the backend can store.
    #[error("{kind} id {id} exceeds the backend's integer range")]
    IdTooLarge {
        /// Kind of identifier, e.g. `"asset"`.
        kind: &'static str,
        /// Identifier that failed the conversion.
        id: u64,
    },
    /// A persisted timestamp could not be represented.
    #[error("timestamp {millis} of activity {activity_id} is outside the supported range")]
    TimestampOutOfRange {
        /// Activity carrying the timestamp.
        activity_id: u64,
        /// Raw milliseconds since the Unix epoch.
        millis: i64,
    },
    /// The asset to update does not exist.
    #[error("asset {asset_id} does not exist")]
    UnknownAsset {
        /// Identifier of the missing asset.
        asset_id: AssetId,
    },
}

impl StoreError {
    /// Wrap a backend failure.
    pub fn backend(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            operation,
            source: source.into(),
        }
    }
}

/// Filter for activity lookups.
///
/// Only records created strictly after `created_after` match. When
/// `created_until` is set, records must also be created at or before it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use suitec_core::ActivityQuery;
///
/// let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let query = ActivityQuery::since(since).in_course(Some(4));
/// assert!(!query.matches(4, since));
/// assert!(query.matches(4, since + chrono::TimeDelta::milliseconds(1)));
/// assert!(!query.matches(5, since + chrono::TimeDelta::milliseconds(1)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Exclusive lower bound on `created_at`.
    pub created_after: DateTime<Utc>,
    /// Inclusive upper bound on `created_at`.
    pub created_until: Option<DateTime<Utc>>,
    /// Restrict matches to a single course.
    pub course_id: Option<CourseId>,
}

impl ActivityQuery {
    /// Match every record created after `created_after`, in any course.
    pub const fn since(created_after: DateTime<Utc>) -> Self {
        Self {
            created_after,
            created_until: None,
            course_id: None,
        }
    }

    /// Restrict the query to a course. `None` keeps every course.
    #[must_use]
    pub const fn in_course(mut self, course_id: Option<CourseId>) -> Self {
        self.course_id = course_id;
        self
    }

    /// Bound the query from above (inclusive).
    #[must_use]
    pub const fn until(mut self, created_until: DateTime<Utc>) -> Self {
        self.created_until = Some(created_until);
        self
    }

    /// Report whether a record with the given course and timestamp matches.
    pub fn matches(&self, course_id: CourseId, created_at: DateTime<Utc>) -> bool {
        created_at > self.created_after
            && self.created_until.is_none_or(|until| created_at <= until)
            && self.course_id.is_none_or(|course| course == course_id)
    }
}

/// Read access to courses and recorded activity.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Look up a course by identifier.
    async fn course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError>;

    /// Return every course, ordered by identifier.
    async fn courses(&self) -> Result<Vec<Course>, StoreError>;

    /// Return the records matching `query` that reference an asset.
    async fn asset_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityRecord>, StoreError>;

    /// Return every record matching `query`, with or without an asset.
    async fn activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityRecord>, StoreError>;

    /// Return the activity-type overrides configured for a course.
    async fn activity_type_overrides(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ActivityTypeOverride>, StoreError>;
}

/// Read and write access to persisted trending scores.
#[async_trait]
pub trait AssetScoreStore: Send + Sync {
    /// Return every asset whose trending score is non-zero, optionally
    /// restricted to one course.
    async fn nonzero_trending_scores(
        &self,
        course_id: Option<CourseId>,
    ) -> Result<Vec<AssetScore>, StoreError>;

    /// Persist the trending score of a single asset.
    async fn set_trending_score(&self, asset_id: AssetId, score: i64) -> Result<(), StoreError>;

    /// Return up to `limit` assets of a course with the highest positive
    /// trending scores, highest first and ties broken by lower id.
    async fn top_trending(
        &self,
        course_id: CourseId,
        limit: usize,
    ) -> Result<Vec<AssetScore>, StoreError>;
}
