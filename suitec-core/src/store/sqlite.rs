//! SQLite-backed implementation of the store traits.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::{
    ActivityQuery, ActivityRecord, ActivityStore, ActivityTypeOverride, AssetId, AssetScore,
    AssetScoreStore, Course, CourseId, StoreError,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    enable_daily_notifications INTEGER NOT NULL DEFAULT 1,
    enable_weekly_notifications INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES courses (id),
    trending_score INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS assets_course_trending ON assets (course_id, trending_score);
CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    asset_id INTEGER REFERENCES assets (id),
    course_id INTEGER NOT NULL REFERENCES courses (id),
    user_id INTEGER,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS activities_course_created ON activities (course_id, created_at);
CREATE TABLE IF NOT EXISTS activity_type_overrides (
    course_id INTEGER NOT NULL REFERENCES courses (id),
    type TEXT NOT NULL,
    points INTEGER,
    enabled INTEGER,
    PRIMARY KEY (course_id, type)
);
";

const ACTIVITY_COLUMNS: &str = "id, type, asset_id, course_id, user_id, created_at";

/// Errors raised while opening an SQLite store.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Creating the parent directory of the database failed.
    #[error("failed to create parent directory for {path}")]
    CreateDirectory {
        /// Requested database path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Requested database path.
        path: Utf8PathBuf,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the schema failed.
    #[error("failed to initialise the SQLite schema")]
    Schema {
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A previous operation panicked while holding the connection.
    #[error("SQLite connection lock was poisoned")]
    Poisoned,
}

/// Store backed by a single SQLite connection.
///
/// Calls run on tokio's blocking pool one at a time; the connection is
/// guarded by a mutex. Timestamps are stored as Unix milliseconds.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (and if needed create) the database at `path`.
    ///
    /// Missing parent directories and tables are created.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        suitec_fs::ensure_parent_dir(path).map_err(|source| {
            SqliteStoreError::CreateDirectory {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::initialise(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
                path: Utf8PathBuf::from(":memory:"),
                source,
            })?;
        Self::initialise(connection)
    }

    fn initialise(connection: Connection) -> Result<Self, SqliteStoreError> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| SqliteStoreError::Schema { source })?;
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| SqliteStoreError::Schema { source })?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Insert or replace a course.
    pub async fn upsert_course(&self, course: Course) -> Result<(), StoreError> {
        self.with_connection("persist course", move |connection| {
            let id = to_sql_id("course", course.id)?;
            connection
                .execute(
                    "INSERT OR REPLACE INTO courses
                        (id, name, active, enable_daily_notifications, enable_weekly_notifications)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        id,
                        &course.name,
                        course.active,
                        course.daily_notifications,
                        course.weekly_notifications,
                    ),
                )
                .map_err(|source| StoreError::backend("persist course", source))?;
            Ok(())
        })
        .await
    }

    /// Insert an asset into a course with an initial trending score.
    pub async fn insert_asset(
        &self,
        asset_id: AssetId,
        course_id: CourseId,
        trending_score: i64,
    ) -> Result<(), StoreError> {
        self.with_connection("persist asset", move |connection| {
            connection
                .execute(
                    "INSERT OR REPLACE INTO assets (id, course_id, trending_score)
                     VALUES (?1, ?2, ?3)",
                    (
                        to_sql_id("asset", asset_id)?,
                        to_sql_id("course", course_id)?,
                        trending_score,
                    ),
                )
                .map_err(|source| StoreError::backend("persist asset", source))?;
            Ok(())
        })
        .await
    }

    /// Append an activity record.
    pub async fn record_activity(&self, record: ActivityRecord) -> Result<(), StoreError> {
        self.with_connection("record activity", move |connection| {
            let asset_id = record
                .asset_id
                .map(|id| to_sql_id("asset", id))
                .transpose()?;
            let user_id = record
                .user_id
                .map(|id| to_sql_id("user", id))
                .transpose()?;
            connection
                .execute(
                    "INSERT INTO activities (id, type, asset_id, course_id, user_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    (
                        to_sql_id("activity", record.id)?,
                        &record.activity_type,
                        asset_id,
                        to_sql_id("course", record.course_id)?,
                        user_id,
                        record.created_at.timestamp_millis(),
                    ),
                )
                .map_err(|source| StoreError::backend("record activity", source))?;
            Ok(())
        })
        .await
    }

    /// Insert or replace a course's override of an activity type.
    pub async fn upsert_activity_type_override(
        &self,
        course_id: CourseId,
        entry: ActivityTypeOverride,
    ) -> Result<(), StoreError> {
        self.with_connection("persist activity type override", move |connection| {
            connection
                .execute(
                    "INSERT OR REPLACE INTO activity_type_overrides (course_id, type, points, enabled)
                     VALUES (?1, ?2, ?3, ?4)",
                    (
                        to_sql_id("course", course_id)?,
                        &entry.activity_type,
                        entry.points,
                        entry.enabled,
                    ),
                )
                .map_err(|source| StoreError::backend("persist activity type override", source))?;
            Ok(())
        })
        .await
    }

    async fn with_connection<T, F>(&self, operation: &'static str, task: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| StoreError::backend(operation, SqliteStoreError::Poisoned))?;
            task(&guard)
        })
        .await
        .map_err(|source| StoreError::backend(operation, source))?
    }
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        self.with_connection("read course", move |connection| {
            let row = connection
                .query_row(
                    "SELECT id, name, active, enable_daily_notifications, enable_weekly_notifications
                     FROM courses WHERE id = ?1",
                    [to_sql_id("course", course_id)?],
                    raw_course,
                )
                .optional()
                .map_err(|source| StoreError::backend("read course", source))?;
            row.map(RawCourse::into_course).transpose()
        })
        .await
    }

    async fn courses(&self) -> Result<Vec<Course>, StoreError> {
        self.with_connection("read courses", |connection| {
            let mut statement = connection
                .prepare(
                    "SELECT id, name, active, enable_daily_notifications, enable_weekly_notifications
                     FROM courses ORDER BY id",
                )
                .map_err(|source| StoreError::backend("prepare course selection", source))?;
            let rows = statement
                .query_map([], raw_course)
                .map_err(|source| StoreError::backend("query courses", source))?;
            let mut courses = Vec::new();
            for row in rows {
                let raw = row.map_err(|source| StoreError::backend("read course row", source))?;
                courses.push(raw.into_course()?);
            }
            Ok(courses)
        })
        .await
    }

    async fn asset_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let query = *query;
        self.with_connection("read asset activities", move |connection| {
            select_activities(connection, &query, true)
        })
        .await
    }

    async fn activities(&self, query: &ActivityQuery) -> Result<Vec<ActivityRecord>, StoreError> {
        let query = *query;
        self.with_connection("read activities", move |connection| {
            select_activities(connection, &query, false)
        })
        .await
    }

    async fn activity_type_overrides(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ActivityTypeOverride>, StoreError> {
        self.with_connection("read activity type overrides", move |connection| {
            let mut statement = connection
                .prepare(
                    "SELECT type, points, enabled FROM activity_type_overrides
                     WHERE course_id = ?1 ORDER BY type",
                )
                .map_err(|source| StoreError::backend("prepare override selection", source))?;
            let rows = statement
                .query_map([to_sql_id("course", course_id)?], |row| {
                    Ok(ActivityTypeOverride {
                        activity_type: row.get(0)?,
                        points: row.get(1)?,
                        enabled: row.get(2)?,
                    })
                })
                .map_err(|source| StoreError::backend("query overrides", source))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|source| StoreError::backend("read override row", source))
        })
        .await
    }
}

#[async_trait]
impl AssetScoreStore for SqliteStore {
    async fn nonzero_trending_scores(
        &self,
        course_id: Option<CourseId>,
    ) -> Result<Vec<AssetScore>, StoreError> {
        self.with_connection("read trending scores", move |connection| {
            let course = course_id.map(|id| to_sql_id("course", id)).transpose()?;
            let mut statement = connection
                .prepare(
                    "SELECT id, trending_score FROM assets
                     WHERE trending_score <> 0 AND (?1 IS NULL OR course_id = ?1)",
                )
                .map_err(|source| StoreError::backend("prepare score selection", source))?;
            let rows = statement
                .query_map([course], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|source| StoreError::backend("query trending scores", source))?;
            collect_scores(rows)
        })
        .await
    }

    async fn set_trending_score(&self, asset_id: AssetId, score: i64) -> Result<(), StoreError> {
        self.with_connection("update trending score", move |connection| {
            let changed = connection
                .execute(
                    "UPDATE assets SET trending_score = ?1 WHERE id = ?2",
                    (score, to_sql_id("asset", asset_id)?),
                )
                .map_err(|source| StoreError::backend("update trending score", source))?;
            if changed == 0 {
                return Err(StoreError::UnknownAsset { asset_id });
            }
            Ok(())
        })
        .await
    }

    async fn top_trending(
        &self,
        course_id: CourseId,
        limit: usize,
    ) -> Result<Vec<AssetScore>, StoreError> {
        self.with_connection("read top trending assets", move |connection| {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let mut statement = connection
                .prepare(
                    "SELECT id, trending_score FROM assets
                     WHERE course_id = ?1 AND trending_score > 0
                     ORDER BY trending_score DESC, id ASC
                     LIMIT ?2",
                )
                .map_err(|source| StoreError::backend("prepare top trending selection", source))?;
            let rows = statement
                .query_map((to_sql_id("course", course_id)?, limit), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|source| StoreError::backend("query top trending assets", source))?;
            collect_scores(rows)
        })
        .await
    }
}

struct RawCourse {
    id: i64,
    name: String,
    active: bool,
    daily: bool,
    weekly: bool,
}

impl RawCourse {
    fn into_course(self) -> Result<Course, StoreError> {
        Ok(Course {
            id: from_sql_id("course", self.id)?,
            name: self.name,
            active: self.active,
            daily_notifications: self.daily,
            weekly_notifications: self.weekly,
        })
    }
}

fn raw_course(row: &Row<'_>) -> rusqlite::Result<RawCourse> {
    Ok(RawCourse {
        id: row.get(0)?,
        name: row.get(1)?,
        active: row.get(2)?,
        daily: row.get(3)?,
        weekly: row.get(4)?,
    })
}

type RawActivity = (i64, String, Option<i64>, i64, Option<i64>, i64);

fn select_activities(
    connection: &Connection,
    query: &ActivityQuery,
    assets_only: bool,
) -> Result<Vec<ActivityRecord>, StoreError> {
    let asset_filter = if assets_only {
        "asset_id IS NOT NULL AND "
    } else {
        ""
    };
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities
         WHERE {asset_filter}created_at > ?1
           AND (?2 IS NULL OR created_at <= ?2)
           AND (?3 IS NULL OR course_id = ?3)
         ORDER BY created_at, id"
    );
    let course = query
        .course_id
        .map(|id| to_sql_id("course", id))
        .transpose()?;
    let mut statement = connection
        .prepare(&sql)
        .map_err(|source| StoreError::backend("prepare activity selection", source))?;
    let rows = statement
        .query_map(
            (
                query.created_after.timestamp_millis(),
                query.created_until.map(|until| until.timestamp_millis()),
                course,
            ),
            |row| -> rusqlite::Result<RawActivity> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .map_err(|source| StoreError::backend("query activities", source))?;

    let mut records = Vec::new();
    for row in rows {
        let raw = row.map_err(|source| StoreError::backend("read activity row", source))?;
        records.push(activity_from_raw(raw)?);
    }
    Ok(records)
}

fn activity_from_raw(raw: RawActivity) -> Result<ActivityRecord, StoreError> {
    let (id, activity_type, asset_id, course_id, user_id, millis) = raw;
    let id = from_sql_id("activity", id)?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or(
        StoreError::TimestampOutOfRange {
            activity_id: id,
            millis,
        },
    )?;
    Ok(ActivityRecord {
        id,
        activity_type,
        asset_id: asset_id.map(|value| from_sql_id("asset", value)).transpose()?,
        course_id: from_sql_id("course", course_id)?,
        user_id: user_id.map(|value| from_sql_id("user", value)).transpose()?,
        created_at,
    })
}

fn collect_scores<I>(rows: I) -> Result<Vec<AssetScore>, StoreError>
where
    I: Iterator<Item = rusqlite::Result<(i64, i64)>>,
{
    let mut scores = Vec::new();
    for row in rows {
        let (id, score) = row.map_err(|source| StoreError::backend("read score row", source))?;
        scores.push(AssetScore::new(from_sql_id("asset", id)?, score));
    }
    Ok(scores)
}

fn to_sql_id(kind: &'static str, id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdTooLarge { kind, id })
}

fn from_sql_id(kind: &'static str, id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::IdOutOfRange { kind, id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    async fn seeded(now: DateTime<Utc>) -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        store
            .upsert_course(Course::new(1, "Art History"))
            .await
            .expect("insert course 1");
        store
            .upsert_course(Course::new(2, "Botany"))
            .await
            .expect("insert course 2");
        store.insert_asset(10, 1, 0).await.expect("insert asset 10");
        store.insert_asset(11, 1, 7).await.expect("insert asset 11");
        store.insert_asset(20, 2, 4).await.expect("insert asset 20");
        store
            .record_activity(ActivityRecord::new(1, "like", 1, now).with_asset(10))
            .await
            .expect("record like");
        store
            .record_activity(ActivityRecord::new(2, "add_discussion_topic", 1, now))
            .await
            .expect("record topic");
        store
            .record_activity(
                ActivityRecord::new(3, "comment", 2, now - TimeDelta::hours(2)).with_asset(20),
            )
            .await
            .expect("record comment");
        store
    }

    #[rstest]
    #[tokio::test]
    async fn asset_activities_skip_records_without_assets(now: DateTime<Utc>) {
        let store = seeded(now).await;
        let query = ActivityQuery::since(now - TimeDelta::hours(1));

        let assets = store.asset_activities(&query).await.expect("read");
        let all = store.activities(&query).await.expect("read");

        assert_eq!(assets.len(), 1);
        assert_eq!(assets.first().map(|record| record.id), Some(1));
        assert_eq!(all.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn lower_bound_is_strict(now: DateTime<Utc>) {
        let store = seeded(now).await;

        let excluded = store
            .asset_activities(&ActivityQuery::since(now))
            .await
            .expect("read");
        let included = store
            .asset_activities(&ActivityQuery::since(now - TimeDelta::milliseconds(1)))
            .await
            .expect("read");

        assert!(excluded.is_empty());
        assert_eq!(included.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn scores_are_scoped_by_course(now: DateTime<Utc>) {
        let store = seeded(now).await;

        let all = store.nonzero_trending_scores(None).await.expect("read");
        let course_one = store.nonzero_trending_scores(Some(1)).await.expect("read");

        assert_eq!(all.len(), 2);
        assert_eq!(course_one, vec![AssetScore::new(11, 7)]);
    }

    #[rstest]
    #[tokio::test]
    async fn updating_unknown_asset_fails(now: DateTime<Utc>) {
        let store = seeded(now).await;
        let err = store
            .set_trending_score(999, 3)
            .await
            .expect_err("unknown asset");
        assert!(matches!(err, StoreError::UnknownAsset { asset_id: 999 }));
    }

    #[rstest]
    #[tokio::test]
    async fn top_trending_orders_by_score_then_id(now: DateTime<Utc>) {
        let store = seeded(now).await;
        store.insert_asset(12, 1, 7).await.expect("insert asset 12");
        store.insert_asset(13, 1, 9).await.expect("insert asset 13");

        let top = store.top_trending(1, 2).await.expect("read");

        assert_eq!(top, vec![AssetScore::new(13, 9), AssetScore::new(11, 7)]);
    }

    #[rstest]
    #[tokio::test]
    async fn overrides_round_trip_through_the_database(now: DateTime<Utc>) {
        let store = seeded(now).await;
        store
            .upsert_activity_type_override(1, ActivityTypeOverride::points("like", 4))
            .await
            .expect("persist override");

        let overrides = store.activity_type_overrides(1).await.expect("read");

        assert_eq!(overrides, vec![ActivityTypeOverride::points("like", 4)]);
        assert!(store.activity_type_overrides(2).await.expect("read").is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn open_creates_nested_database() {
        let temp = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(temp.path().join("nested/suitec.db"))
            .expect("utf-8 path");

        let store = SqliteStore::open(&path).expect("open nested database");
        store
            .upsert_course(Course::new(1, "Art History"))
            .await
            .expect("insert course");

        assert!(path.exists(), "database should be created at nested path");
        assert_eq!(store.courses().await.expect("read").len(), 1);
    }
}
