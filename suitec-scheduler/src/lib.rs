//! Timer chains for the SuiteC background jobs.
//!
//! Every job runs on its own tokio task following the same loop: compute the
//! next fire time from a [`Schedule`], sleep, run, repeat. Three schedules
//! cover the jobs the engine starts:
//! - [`FixedInterval`] drives trending-score recalculation, first
//!   immediately and then a fixed delay after each run completes;
//! - [`DailyAt`] and [`WeeklyAt`] drive the notification digests at an
//!   absolute wall-clock hour.
//!
//! Digest jobs ([`DigestJob`]) summarise each eligible course's activity
//! over the period and hand the result to a [`DigestSink`]; the bundled
//! [`JsonLinesDigestSink`] appends them to an outbox file.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc, Weekday};
//! use suitec_scheduler::WeeklyAt;
//!
//! let schedule = WeeklyAt::in_zone(Weekday::Mon, 8, Utc).unwrap();
//! let tuesday = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
//! let next = schedule.next_fire(tuesday).unwrap();
//! assert_eq!(next, Utc.with_ymd_and_hms(2024, 4, 8, 8, 0, 0).unwrap());
//! ```

#![forbid(unsafe_code)]

mod digest;
mod error;
mod schedule;
mod sink;
mod timer;

pub use digest::{CourseDigest, DigestJob, DigestPeriod, DigestSink, TRENDING_ASSETS_PER_DIGEST};
pub use error::{DigestError, ScheduleError};
pub use schedule::{DailyAt, FixedInterval, Schedule, WeeklyAt};
pub use sink::JsonLinesDigestSink;
pub use timer::{
    ScheduledJob, TrendingRecalculation, schedule_recalculate_trending_scores, spawn_timer_chain,
};
