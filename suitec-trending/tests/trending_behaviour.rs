//! Behavioural coverage for the trending-score recalculation cycle.

use std::cell::RefCell;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use suitec_core::test_support::MemoryStore;
use suitec_core::{ActivityConfiguration, ActivityRecord, Course, CourseId};
use suitec_trending::{RecalculationReport, TrendingEngine, TrendingError, TrendingSettings};

/// Outcome of the most recent cycle.
pub type Outcome = RefCell<Option<Result<RecalculationReport, TrendingError>>>;

/// In-memory store shared by every step of a scenario.
#[fixture]
pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Pinned clock for the scenario.
#[fixture]
pub fn now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2024, 4, 2, 15, 0, 0).single() {
        Some(moment) => moment,
        None => panic!("fixed timestamp must be valid"),
    }
}

/// Captures the outcome of recalculation for assertions.
#[fixture]
pub fn outcome() -> Outcome {
    RefCell::new(None)
}

fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    TrendingSettings::default().window_start(now)
}

fn add_asset(store: &MemoryStore, course_id: CourseId, asset_id: u64, score: i64) {
    store.insert_course(Course::new(course_id, format!("Course {course_id}")));
    store.insert_asset(asset_id, course_id, score);
}

fn record(store: &MemoryStore, id: u64, kind: &str, asset_id: u64, at: DateTime<Utc>) {
    store.record(ActivityRecord::new(id, kind, 1, at).with_asset(asset_id));
}

#[expect(
    clippy::expect_used,
    reason = "scenarios should fail fast when the runtime cannot start"
)]
fn run_cycle(
    store: &Arc<MemoryStore>,
    course_id: Option<CourseId>,
    now: DateTime<Utc>,
) -> Result<RecalculationReport, TrendingError> {
    let engine = TrendingEngine::new(
        Arc::clone(store),
        ActivityConfiguration::builtin(),
        TrendingSettings::default(),
    );
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build runtime")
        .block_on(engine.recalculate_at(course_id, now))
}

fn assert_score(store: &MemoryStore, asset_id: u64, expected: i64) {
    assert_eq!(store.score(asset_id), Some(expected), "score of asset {asset_id}");
}

#[given("course 1 has asset 7 with a trending score of 5")]
fn asset_7_scores_5(store: &Arc<MemoryStore>) {
    add_asset(store, 1, 7, 5);
}

#[given("course 1 has asset 7 with a trending score of 12")]
fn asset_7_scores_12(store: &Arc<MemoryStore>) {
    add_asset(store, 1, 7, 12);
}

#[given("course 1 has asset 8 with a trending score of 4")]
fn asset_8_scores_4(store: &Arc<MemoryStore>) {
    add_asset(store, 1, 8, 4);
}

#[given("course 1 has assets 7 and 9 with no trending score")]
fn assets_7_and_9_unscored(store: &Arc<MemoryStore>) {
    add_asset(store, 1, 7, 0);
    add_asset(store, 1, 9, 0);
}

#[given("course 1 has asset 10 with a trending score of 6")]
fn asset_10_scores_6(store: &Arc<MemoryStore>) {
    add_asset(store, 1, 10, 6);
}

#[given("course 2 has asset 20 with a trending score of 9")]
fn asset_20_scores_9(store: &Arc<MemoryStore>) {
    add_asset(store, 2, 20, 9);
}

#[given("asset 7 received two likes and a comment in the last hour")]
fn asset_7_engagement(store: &Arc<MemoryStore>, now: DateTime<Utc>) {
    let recent = now - TimeDelta::minutes(30);
    record(store, 1, "like", 7, recent);
    record(store, 2, "like", 7, recent);
    record(store, 3, "comment", 7, recent);
}

#[given("asset 7 was liked exactly at the start of the window")]
fn asset_7_liked_at_boundary(store: &Arc<MemoryStore>, now: DateTime<Utc>) {
    record(store, 4, "like", 7, window_start(now));
}

#[given("asset 9 was liked one millisecond after the start of the window")]
fn asset_9_liked_inside(store: &Arc<MemoryStore>, now: DateTime<Utc>) {
    record(store, 5, "like", 9, window_start(now) + TimeDelta::milliseconds(1));
}

#[given("asset 10 was only viewed in the last hour")]
fn asset_10_viewed(store: &Arc<MemoryStore>, now: DateTime<Utc>) {
    record(store, 6, "view_asset", 10, now - TimeDelta::minutes(10));
    record(store, 7, "view_asset", 10, now - TimeDelta::minutes(5));
}

#[given("writes to asset 7 fail")]
fn asset_7_writes_fail(store: &Arc<MemoryStore>) {
    store.fail_writes_for(7);
}

#[when("I recalculate trending scores for all courses")]
fn recalculate_all(store: &Arc<MemoryStore>, now: DateTime<Utc>, outcome: &Outcome) {
    *outcome.borrow_mut() = Some(run_cycle(store, None, now));
}

#[when("I recalculate trending scores for course 1")]
fn recalculate_course_1(store: &Arc<MemoryStore>, now: DateTime<Utc>, outcome: &Outcome) {
    *outcome.borrow_mut() = Some(run_cycle(store, Some(1), now));
}

#[when("I recalculate trending scores again")]
fn recalculate_again(store: &Arc<MemoryStore>, now: DateTime<Utc>, outcome: &Outcome) {
    store.clear_traffic();
    *outcome.borrow_mut() = Some(run_cycle(store, None, now));
}

#[then("asset 7 has a trending score of 12")]
fn asset_7_is_12(store: &Arc<MemoryStore>) {
    assert_score(store, 7, 12);
}

#[then("asset 7 has a trending score of 0")]
fn asset_7_is_0(store: &Arc<MemoryStore>) {
    assert_score(store, 7, 0);
}

#[then("asset 8 has a trending score of 0")]
fn asset_8_is_0(store: &Arc<MemoryStore>) {
    assert_score(store, 8, 0);
}

#[then("asset 9 has a trending score of 3")]
fn asset_9_is_3(store: &Arc<MemoryStore>) {
    assert_score(store, 9, 3);
}

#[then("asset 10 has a trending score of 0")]
fn asset_10_is_0(store: &Arc<MemoryStore>) {
    assert_score(store, 10, 0);
}

#[then("asset 20 still has a trending score of 9")]
fn asset_20_is_9(store: &Arc<MemoryStore>) {
    assert_score(store, 20, 9);
}

#[then("exactly one score was written")]
fn one_write(store: &Arc<MemoryStore>) {
    assert_eq!(store.writes().len(), 1);
}

#[then("no score was written")]
fn no_writes(store: &Arc<MemoryStore>, outcome: &Outcome) {
    assert!(store.writes().is_empty(), "unexpected writes: {:?}", store.writes());
    let binding = outcome.borrow();
    match binding.as_ref() {
        Some(Ok(report)) => assert_eq!(report.updates_applied, 0),
        Some(Err(err)) => panic!("recalculation should succeed, got {err}"),
        None => panic!("recalculation outcome must be recorded"),
    }
}

#[then("recalculation only read course 1")]
fn only_course_1_read(store: &Arc<MemoryStore>) {
    assert_eq!(store.score_reads(), vec![Some(1)]);
    assert!(
        store
            .activity_reads()
            .iter()
            .all(|query| query.course_id == Some(1)),
        "activity reads must be scoped to course 1"
    );
    assert!(
        store.writes().iter().all(|(asset_id, _)| *asset_id != 20),
        "course 2 assets must not be written"
    );
}

#[then("the cycle reports a failed update for asset 7")]
fn failed_update_reported(outcome: &Outcome) {
    let binding = outcome.borrow();
    match binding.as_ref() {
        Some(Err(TrendingError::UpdateScore {
            asset_id, failed, ..
        })) => {
            assert_eq!(*asset_id, 7);
            assert_eq!(*failed, 1);
        }
        Some(Err(other)) => panic!("unexpected error: {other}"),
        Some(Ok(_)) => panic!("expected the failed write to be reported"),
        None => panic!("recalculation outcome must be recorded"),
    }
}

#[scenario(path = "tests/features/trending.feature", index = 0)]
fn impact_is_summed(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 1)]
fn unchanged_scores_are_skipped(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 2)]
fn second_cycle_is_idempotent(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 3)]
fn stale_assets_are_zeroed(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 4)]
fn window_start_is_excluded(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 5)]
fn views_never_trend(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 6)]
fn course_scope_is_respected(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}

#[scenario(path = "tests/features/trending.feature", index = 7)]
fn failed_writes_continue(store: Arc<MemoryStore>, now: DateTime<Utc>, outcome: Outcome) {
    let _ = (store, now, outcome);
}
