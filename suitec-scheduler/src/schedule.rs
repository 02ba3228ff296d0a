//! Fire-time computation shared by every timer chain.
#![forbid(unsafe_code)]

use std::time::Duration;

use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone, Utc, Weekday};

use crate::ScheduleError;

const SEARCH_DAYS: u64 = 15;

/// Decides how long a timer chain sleeps before each run.
pub trait Schedule: Send + Sync {
    /// Delay before the first run of a chain started at `now`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::NoFireTime`] when no future run exists.
    fn first_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError>;

    /// Delay before the next run, given a run that completed at `now`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::NoFireTime`] when no future run exists.
    fn next_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError>;
}

/// Runs immediately, then again `interval` after each run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Build an interval schedule.
    ///
    /// # Errors
    /// Returns [`ScheduleError::ZeroInterval`] when `interval` is zero.
    pub const fn new(interval: Duration) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self { interval })
    }

    /// Build an interval schedule measured in minutes.
    ///
    /// # Errors
    /// Returns [`ScheduleError::ZeroInterval`] when `minutes` is zero.
    pub fn minutes(minutes: u32) -> Result<Self, ScheduleError> {
        Self::new(Duration::from_secs(u64::from(minutes).saturating_mul(60)))
    }

    /// The configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Schedule for FixedInterval {
    fn first_delay(&self, _now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        Ok(Duration::ZERO)
    }

    fn next_delay(&self, _now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        Ok(self.interval)
    }
}

/// Fires every day at `hour:00` in the given time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAt<Tz = Local> {
    hour: u32,
    zone: Tz,
}

impl DailyAt<Local> {
    /// Fire daily at `hour:00` server local time.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidHour`] when `hour` exceeds 23.
    pub fn new(hour: u32) -> Result<Self, ScheduleError> {
        Self::in_zone(hour, Local)
    }
}

impl<Tz: TimeZone> DailyAt<Tz> {
    /// Fire daily at `hour:00` in `zone`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidHour`] when `hour` exceeds 23.
    pub fn in_zone(hour: u32, zone: Tz) -> Result<Self, ScheduleError> {
        validate_hour(hour)?;
        Ok(Self { hour, zone })
    }

    /// The first fire time strictly after `now`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::NoFireTime`] when the zone skips every
    /// candidate in the search horizon.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        next_wall_clock(&self.zone, now, self.hour, None)
    }
}

impl<Tz> Schedule for DailyAt<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn first_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        delay_until(self.next_fire(now)?, now)
    }

    fn next_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        delay_until(self.next_fire(now)?, now)
    }
}

/// Fires every week on `weekday` at `hour:00` in the given time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyAt<Tz = Local> {
    weekday: Weekday,
    hour: u32,
    zone: Tz,
}

impl WeeklyAt<Local> {
    /// Fire weekly on `weekday` at `hour:00` server local time.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidHour`] when `hour` exceeds 23.
    pub fn new(weekday: Weekday, hour: u32) -> Result<Self, ScheduleError> {
        Self::in_zone(weekday, hour, Local)
    }
}

impl<Tz: TimeZone> WeeklyAt<Tz> {
    /// Fire weekly on `weekday` at `hour:00` in `zone`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InvalidHour`] when `hour` exceeds 23.
    pub fn in_zone(weekday: Weekday, hour: u32, zone: Tz) -> Result<Self, ScheduleError> {
        validate_hour(hour)?;
        Ok(Self {
            weekday,
            hour,
            zone,
        })
    }

    /// The first fire time strictly after `now`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::NoFireTime`] when the zone skips every
    /// candidate in the search horizon.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        next_wall_clock(&self.zone, now, self.hour, Some(self.weekday))
    }
}

impl<Tz> Schedule for WeeklyAt<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn first_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        delay_until(self.next_fire(now)?, now)
    }

    fn next_delay(&self, now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
        delay_until(self.next_fire(now)?, now)
    }
}

const fn validate_hour(hour: u32) -> Result<(), ScheduleError> {
    if hour > 23 {
        return Err(ScheduleError::InvalidHour { hour });
    }
    Ok(())
}

/// Walk forward day by day from the local date of `now` until a candidate
/// `hour:00` exists in `zone` and lies strictly after `now`. Local times that
/// fall into a DST gap are skipped.
fn next_wall_clock<Tz: TimeZone>(
    zone: &Tz,
    now: DateTime<Utc>,
    hour: u32,
    weekday: Option<Weekday>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).ok_or(ScheduleError::InvalidHour { hour })?;
    let today = now.with_timezone(zone).date_naive();
    (0..SEARCH_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| weekday.is_none_or(|day| date.weekday() == day))
        .filter_map(|date| zone.from_local_datetime(&date.and_time(at)).earliest())
        .map(|fire| fire.with_timezone(&Utc))
        .find(|fire| *fire > now)
        .ok_or(ScheduleError::NoFireTime { after: now })
}

fn delay_until(fire: DateTime<Utc>, now: DateTime<Utc>) -> Result<Duration, ScheduleError> {
    (fire - now)
        .to_std()
        .map_err(|_| ScheduleError::NoFireTime { after: now })
}
