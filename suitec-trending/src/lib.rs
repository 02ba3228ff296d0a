//! Trending-score recalculation for course assets.
//!
//! An asset's trending score is the sum of the impact weights of the
//! activities recorded against it inside a sliding window. A cycle runs three
//! steps:
//! - **Aggregation** ([`aggregate_impact`]) sums impact per asset over the
//!   activity records in the window, looking weights up in the injected
//!   [`ActivityConfiguration`].
//! - **Reconciliation** ([`reconcile_scores`]) compares the aggregate with
//!   the persisted non-zero scores and keeps only the writes that change
//!   something, resetting assets that dropped out of the window to zero.
//! - **Persistence** ([`TrendingEngine`]) applies those writes one at a time.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use suitec_core::AssetScore;
//! use suitec_trending::reconcile_scores;
//!
//! let aggregated = BTreeMap::from([(7, 12)]);
//! let updates = reconcile_scores(&aggregated, &[AssetScore::new(7, 5), AssetScore::new(8, 3)]);
//! assert_eq!(updates.get(7), Some(12));
//! assert_eq!(updates.get(8), Some(0));
//! ```

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use suitec_core::{ActivityConfiguration, ActivityRecord, AssetId, AssetScore};

mod engine;
mod error;
mod types;

pub use engine::TrendingEngine;
pub use error::TrendingError;
pub use types::{
    DEFAULT_ACTIVITY_WINDOW_HOURS, RecalculationReport, ScoreUpdates, TrendingSettings,
};

/// Sum the impact of `records` per asset.
///
/// Records without an asset, of unknown types, or of types without impact
/// contribute nothing. Assets with no contribution are absent from the map.
#[must_use]
pub fn aggregate_impact<'a, I>(records: I, table: &ActivityConfiguration) -> BTreeMap<AssetId, i64>
where
    I: IntoIterator<Item = &'a ActivityRecord>,
{
    let mut totals = BTreeMap::new();
    for record in records {
        let Some(asset_id) = record.asset_id else {
            continue;
        };
        let Some(impact) = table.impact(&record.activity_type) else {
            continue;
        };
        let total: &mut i64 = totals.entry(asset_id).or_default();
        *total = total.saturating_add(impact);
    }
    totals
}

/// Compute the writes that bring `persisted` in line with `aggregated`.
///
/// `persisted` holds the non-zero scores currently stored; an asset missing
/// from it is taken to score zero. Persisted assets absent from the
/// aggregate are reset to zero, and aggregated assets are written unless the
/// stored score already matches.
#[must_use]
pub fn reconcile_scores(
    aggregated: &BTreeMap<AssetId, i64>,
    persisted: &[AssetScore],
) -> ScoreUpdates {
    let current: BTreeMap<AssetId, i64> = persisted
        .iter()
        .map(|score| (score.asset_id, score.trending_score))
        .collect();

    let mut updates = BTreeMap::new();
    for (asset_id, stored) in &current {
        if *stored != 0 && !aggregated.contains_key(asset_id) {
            updates.insert(*asset_id, 0);
        }
    }
    for (asset_id, score) in aggregated {
        let stored = current.get(asset_id).copied().unwrap_or_default();
        if stored != *score {
            updates.insert(*asset_id, *score);
        }
    }
    ScoreUpdates::new(updates)
}
