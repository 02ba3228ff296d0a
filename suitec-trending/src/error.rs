//! Error types raised while recalculating trending scores.
#![forbid(unsafe_code)]

use suitec_core::{AssetId, CourseId, StoreError};
use thiserror::Error;

/// Errors raised while recalculating trending scores.
#[derive(Debug, Error)]
pub enum TrendingError {
    /// The activity window must span at least one hour.
    #[error("activity window must be a positive number of hours, got {hours}")]
    InvalidWindow {
        /// Rejected window length.
        hours: u32,
    },
    /// The course to recalculate does not exist.
    #[error("course {course_id} does not exist")]
    UnknownCourse {
        /// Requested course.
        course_id: CourseId,
    },
    /// Looking up the course to recalculate failed.
    #[error("failed to read course {course_id}")]
    ReadCourse {
        /// Requested course.
        course_id: CourseId,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Reading activity records failed.
    #[error("failed to read activities in the trending window")]
    ReadActivities {
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Reading persisted trending scores failed.
    #[error("failed to read persisted trending scores")]
    ReadScores {
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// One or more score writes failed. Carries the first failure.
    #[error("failed to update trending score of asset {asset_id} ({failed} update(s) failed)")]
    UpdateScore {
        /// Asset whose update failed first.
        asset_id: AssetId,
        /// Number of failed updates in the batch.
        failed: usize,
        /// Source error of the first failure.
        #[source]
        source: StoreError,
    },
}
