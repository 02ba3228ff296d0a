//! Core domain types for the SuiteC engine.
//!
//! The crate models the facts the background jobs read (activity records,
//! courses, persisted asset scores), the process-wide activity-type table, and
//! the collaborator traits that persistence layers implement. Everything
//! downstream (trending recalculation, notification digests) depends only on
//! these traits, so the engine runs unchanged against SQLite or the in-memory
//! test store.

use chrono::{DateTime, Utc};

pub mod activity;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use activity::{ActivityConfiguration, ActivityTypeConfig, ActivityTypeOverride};
pub use store::{ActivityQuery, ActivityStore, AssetScoreStore, BoxError, StoreError};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteStore, SqliteStoreError};

/// Identifier of an asset in a course asset library.
pub type AssetId = u64;

/// Identifier of a course.
pub type CourseId = u64;

/// Identifier of a user.
pub type UserId = u64;

/// A single tracked user action.
///
/// Records are immutable facts written by the rest of the system whenever a
/// user views, likes, comments on or pins an asset (among other actions).
/// The engine only ever reads them.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use suitec_core::ActivityRecord;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// let record = ActivityRecord::new(1, "like", 7, at).with_asset(42);
/// assert_eq!(record.asset_id, Some(42));
/// assert_eq!(record.activity_type, "like");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityRecord {
    /// Unique identifier.
    pub id: u64,
    /// Activity type key, e.g. `"like"` or `"view_asset"`.
    pub activity_type: String,
    /// Asset the activity relates to, when it relates to one.
    pub asset_id: Option<AssetId>,
    /// Course in which the activity happened.
    pub course_id: CourseId,
    /// User who performed the activity, if known.
    pub user_id: Option<UserId>,
    /// Moment the activity was recorded.
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// Construct a record that is not tied to an asset.
    pub fn new(
        id: u64,
        activity_type: impl Into<String>,
        course_id: CourseId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            activity_type: activity_type.into(),
            asset_id: None,
            course_id,
            user_id: None,
            created_at,
        }
    }

    /// Attach the record to an asset.
    #[must_use]
    pub fn with_asset(mut self, asset_id: AssetId) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    /// Attribute the record to a user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// A course and the flags that gate its background jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Course {
    /// Unique identifier.
    pub id: CourseId,
    /// Display name used in digests.
    pub name: String,
    /// Inactive courses receive no notifications.
    pub active: bool,
    /// Whether the daily digest is enabled.
    pub daily_notifications: bool,
    /// Whether the weekly digest is enabled.
    pub weekly_notifications: bool,
}

impl Course {
    /// Construct an active course with both digests enabled.
    pub fn new(id: CourseId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            daily_notifications: true,
            weekly_notifications: true,
        }
    }

    /// Set whether the course is active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the daily and weekly notification flags.
    #[must_use]
    pub fn with_notifications(mut self, daily: bool, weekly: bool) -> Self {
        self.daily_notifications = daily;
        self.weekly_notifications = weekly;
        self
    }
}

/// Persisted trending score of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetScore {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Current trending score.
    pub trending_score: i64,
}

impl AssetScore {
    /// Pair an asset with its score.
    pub const fn new(asset_id: AssetId, trending_score: i64) -> Self {
        Self {
            asset_id,
            trending_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn moment() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn new_record_has_no_asset_or_user(moment: DateTime<Utc>) {
        let record = ActivityRecord::new(1, "add_discussion_topic", 3, moment);
        assert_eq!(record.asset_id, None);
        assert_eq!(record.user_id, None);
        assert_eq!(record.course_id, 3);
    }

    #[rstest]
    fn builders_attach_asset_and_user(moment: DateTime<Utc>) {
        let record = ActivityRecord::new(1, "like", 3, moment)
            .with_asset(9)
            .with_user(11);
        assert_eq!(record.asset_id, Some(9));
        assert_eq!(record.user_id, Some(11));
    }

    #[rstest]
    fn new_course_is_active_with_digests() {
        let course = Course::new(5, "Design 101");
        assert!(course.active);
        assert!(course.daily_notifications);
        assert!(course.weekly_notifications);
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    fn course_notification_flags_are_independent(#[case] daily: bool, #[case] weekly: bool) {
        let course = Course::new(5, "Design 101").with_notifications(daily, weekly);
        assert_eq!(course.daily_notifications, daily);
        assert_eq!(course.weekly_notifications, weekly);
    }
}
