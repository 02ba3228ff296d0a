//! Settings and output types for trending recalculation.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use suitec_core::{AssetId, CourseId};

use crate::TrendingError;

/// Default lookback window, in hours.
pub const DEFAULT_ACTIVITY_WINDOW_HOURS: u32 = 24;

/// Tunables for a recalculation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendingSettings {
    window_hours: u32,
}

impl TrendingSettings {
    /// Build settings with an activity window of `window_hours`.
    ///
    /// # Errors
    /// Returns [`TrendingError::InvalidWindow`] when `window_hours` is zero.
    pub const fn new(window_hours: u32) -> Result<Self, TrendingError> {
        if window_hours == 0 {
            return Err(TrendingError::InvalidWindow {
                hours: window_hours,
            });
        }
        Ok(Self { window_hours })
    }

    /// Length of the activity window in hours.
    #[must_use]
    pub const fn window_hours(&self) -> u32 {
        self.window_hours
    }

    /// Length of the activity window.
    #[must_use]
    pub fn activity_window(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.window_hours))
    }

    /// Exclusive lower bound of the window ending at `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.activity_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for TrendingSettings {
    fn default() -> Self {
        Self {
            window_hours: DEFAULT_ACTIVITY_WINDOW_HOURS,
        }
    }
}

/// The minimal set of score writes needed to bring persisted scores in line
/// with the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdates {
    updates: BTreeMap<AssetId, i64>,
}

impl ScoreUpdates {
    /// Wrap a pre-computed update map.
    #[expect(
        clippy::missing_const_for_fn,
        reason = "updates are produced at runtime by the reconciler"
    )]
    #[must_use]
    pub fn new(updates: BTreeMap<AssetId, i64>) -> Self {
        Self { updates }
    }

    /// New score for an asset, if it changes.
    #[must_use]
    pub fn get(&self, asset_id: AssetId) -> Option<i64> {
        self.updates.get(&asset_id).copied()
    }

    /// Number of pending writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Report whether nothing needs writing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Iterate over `(asset, new score)` pairs in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, i64)> + '_ {
        self.updates.iter().map(|(asset_id, score)| (*asset_id, *score))
    }

    /// Consume the wrapper and return the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<AssetId, i64> {
        self.updates
    }
}

/// Summary of a completed recalculation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationReport {
    /// Course the cycle was scoped to, `None` for every course.
    pub course_id: Option<CourseId>,
    /// Exclusive lower bound of the activity window.
    pub window_start: DateTime<Utc>,
    /// Assets with impactful activity in the window.
    pub assets_scored: usize,
    /// Score writes issued successfully.
    pub updates_applied: usize,
    /// Successful writes that reset a score to zero.
    pub zeroed: usize,
}
