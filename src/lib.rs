//! Facade crate for the SuiteC background engine.
//!
//! This crate re-exports the core domain types and exposes the trending-score
//! engine, the timer-chain scheduler and the SQLite store behind feature
//! flags.

#![forbid(unsafe_code)]

pub use suitec_core::{
    ActivityConfiguration, ActivityQuery, ActivityRecord, ActivityStore, ActivityTypeConfig,
    ActivityTypeOverride, AssetId, AssetScore, AssetScoreStore, Course, CourseId, StoreError,
};

#[cfg(feature = "store-sqlite")]
pub use suitec_core::{SqliteStore, SqliteStoreError};

#[cfg(feature = "trending")]
pub use suitec_trending::{
    RecalculationReport, ScoreUpdates, TrendingEngine, TrendingError, TrendingSettings,
    aggregate_impact, reconcile_scores,
};

#[cfg(feature = "scheduler")]
pub use suitec_scheduler::{
    CourseDigest, DailyAt, DigestError, DigestJob, DigestPeriod, DigestSink, FixedInterval,
    JsonLinesDigestSink, Schedule, ScheduleError, ScheduledJob, TrendingRecalculation, WeeklyAt,
    schedule_recalculate_trending_scores, spawn_timer_chain,
};

#[cfg(feature = "test-support")]
pub use suitec_core::test_support;
