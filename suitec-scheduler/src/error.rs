//! Error types raised by schedules and digest jobs.
#![forbid(unsafe_code)]

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use suitec_core::{CourseId, StoreError};
use thiserror::Error;

/// Errors raised while building or evaluating a schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Hours must fall in `0..=23`.
    #[error("hour {hour} is outside 0..=23")]
    InvalidHour {
        /// Rejected hour.
        hour: u32,
    },
    /// Fixed intervals must be longer than zero.
    #[error("schedule interval must be positive")]
    ZeroInterval,
    /// No wall-clock fire time exists after `after`.
    #[error("no fire time exists after {after}")]
    NoFireTime {
        /// Moment the search started from.
        after: DateTime<Utc>,
    },
}

/// Errors raised while building or delivering notification digests.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Listing courses failed.
    #[error("failed to read courses")]
    ReadCourses {
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Reading the course's activity for the period failed.
    #[error("failed to read activities of course {course_id}")]
    ReadActivities {
        /// Affected course.
        course_id: CourseId,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Reading the course's activity-type overrides failed.
    #[error("failed to read activity type overrides of course {course_id}")]
    ReadOverrides {
        /// Affected course.
        course_id: CourseId,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Reading the course's top trending assets failed.
    #[error("failed to read trending assets of course {course_id}")]
    ReadTrending {
        /// Affected course.
        course_id: CourseId,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Serialising a digest failed.
    #[error("failed to serialise digest for course {course_id}")]
    Serialise {
        /// Affected course.
        course_id: CourseId,
        /// Source error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Appending to the outbox failed.
    #[error("failed to append digest to {path}")]
    WriteOutbox {
        /// Outbox path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: std::io::Error,
    },
}
