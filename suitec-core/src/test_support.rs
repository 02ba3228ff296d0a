//! Test-only, in-memory store used by unit and behaviour tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{
    ActivityQuery, ActivityRecord, ActivityStore, ActivityTypeOverride, AssetId, AssetScore,
    AssetScoreStore, Course, CourseId, StoreError,
};

#[derive(Debug, Default)]
struct MemoryState {
    courses: BTreeMap<CourseId, Course>,
    assets: BTreeMap<AssetId, (CourseId, i64)>,
    activities: Vec<ActivityRecord>,
    overrides: BTreeMap<CourseId, Vec<ActivityTypeOverride>>,
    writes: Vec<(AssetId, i64)>,
    score_reads: Vec<Option<CourseId>>,
    activity_reads: Vec<ActivityQuery>,
    fail_reads: bool,
    fail_writes: BTreeSet<AssetId>,
}

/// In-memory store implementing both store traits.
///
/// Every score write and read is recorded so tests can assert on traffic,
/// and failures can be injected per operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a course.
    #[must_use]
    pub fn with_course(self, course: Course) -> Self {
        self.insert_course(course);
        self
    }

    /// Add an asset with an initial trending score.
    #[must_use]
    pub fn with_asset(self, asset_id: AssetId, course_id: CourseId, score: i64) -> Self {
        self.insert_asset(asset_id, course_id, score);
        self
    }

    /// Add a course override of the activity-type table.
    #[must_use]
    pub fn with_override(self, course_id: CourseId, entry: ActivityTypeOverride) -> Self {
        self.insert_override(course_id, entry);
        self
    }

    /// Insert or replace a course through a shared reference.
    pub fn insert_course(&self, course: Course) {
        self.state().courses.insert(course.id, course);
    }

    /// Insert or replace an asset through a shared reference.
    pub fn insert_asset(&self, asset_id: AssetId, course_id: CourseId, score: i64) {
        self.state().assets.insert(asset_id, (course_id, score));
    }

    /// Append a course override through a shared reference.
    pub fn insert_override(&self, course_id: CourseId, entry: ActivityTypeOverride) {
        self.state()
            .overrides
            .entry(course_id)
            .or_default()
            .push(entry);
    }

    /// Append an activity record.
    pub fn record(&self, record: ActivityRecord) {
        self.state().activities.push(record);
    }

    /// Current trending score of an asset.
    pub fn score(&self, asset_id: AssetId) -> Option<i64> {
        self.state().assets.get(&asset_id).map(|(_, score)| *score)
    }

    /// Every successful score write, in the order it happened.
    pub fn writes(&self) -> Vec<(AssetId, i64)> {
        self.state().writes.clone()
    }

    /// Forget recorded writes and reads.
    pub fn clear_traffic(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.score_reads.clear();
        state.activity_reads.clear();
    }

    /// Course scopes passed to `nonzero_trending_scores`, in call order.
    pub fn score_reads(&self) -> Vec<Option<CourseId>> {
        self.state().score_reads.clone()
    }

    /// Queries passed to `asset_activities` and `activities`, in call order.
    pub fn activity_reads(&self) -> Vec<ActivityQuery> {
        self.state().activity_reads.clone()
    }

    /// Make every read fail until reset.
    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Make writes to `asset_id` fail.
    pub fn fail_writes_for(&self, asset_id: AssetId) {
        self.state().fail_writes.insert(asset_id);
    }

    fn check_reads(state: &MemoryState, operation: &'static str) -> Result<(), StoreError> {
        if state.fail_reads {
            return Err(StoreError::backend(
                operation,
                std::io::Error::other("injected read failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        let state = self.state();
        Self::check_reads(&state, "read course")?;
        Ok(state.courses.get(&course_id).cloned())
    }

    async fn courses(&self) -> Result<Vec<Course>, StoreError> {
        let state = self.state();
        Self::check_reads(&state, "read courses")?;
        Ok(state.courses.values().cloned().collect())
    }

    async fn asset_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut state = self.state();
        state.activity_reads.push(*query);
        Self::check_reads(&state, "read asset activities")?;
        Ok(state
            .activities
            .iter()
            .filter(|record| record.asset_id.is_some())
            .filter(|record| query.matches(record.course_id, record.created_at))
            .cloned()
            .collect())
    }

    async fn activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut state = self.state();
        state.activity_reads.push(*query);
        Self::check_reads(&state, "read activities")?;
        Ok(state
            .activities
            .iter()
            .filter(|record| query.matches(record.course_id, record.created_at))
            .cloned()
            .collect())
    }

    async fn activity_type_overrides(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ActivityTypeOverride>, StoreError> {
        let state = self.state();
        Self::check_reads(&state, "read activity type overrides")?;
        Ok(state.overrides.get(&course_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AssetScoreStore for MemoryStore {
    async fn nonzero_trending_scores(
        &self,
        course_id: Option<CourseId>,
    ) -> Result<Vec<AssetScore>, StoreError> {
        let mut state = self.state();
        state.score_reads.push(course_id);
        Self::check_reads(&state, "read trending scores")?;
        Ok(state
            .assets
            .iter()
            .filter(|(_, (course, score))| {
                *score != 0 && course_id.is_none_or(|scope| scope == *course)
            })
            .map(|(asset_id, (_, score))| AssetScore::new(*asset_id, *score))
            .collect())
    }

    async fn set_trending_score(&self, asset_id: AssetId, score: i64) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_writes.contains(&asset_id) {
            return Err(StoreError::backend(
                "update trending score",
                std::io::Error::other("injected write failure"),
            ));
        }
        let Some(entry) = state.assets.get_mut(&asset_id) else {
            return Err(StoreError::UnknownAsset { asset_id });
        };
        entry.1 = score;
        state.writes.push((asset_id, score));
        Ok(())
    }

    async fn top_trending(
        &self,
        course_id: CourseId,
        limit: usize,
    ) -> Result<Vec<AssetScore>, StoreError> {
        let state = self.state();
        Self::check_reads(&state, "read top trending assets")?;
        let mut scores: Vec<AssetScore> = state
            .assets
            .iter()
            .filter(|(_, (course, score))| *course == course_id && *score > 0)
            .map(|(asset_id, (_, score))| AssetScore::new(*asset_id, *score))
            .collect();
        scores.sort_by(|a, b| {
            b.trending_score
                .cmp(&a.trending_score)
                .then(a.asset_id.cmp(&b.asset_id))
        });
        scores.truncate(limit);
        Ok(scores)
    }
}
