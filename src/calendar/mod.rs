//! Calendar primitives: day boundaries, time periods, and normally
//! distributed times-of-day
//!
//! All simulation timestamps are naive local datetimes formatted as
//! `YYYY-MM-DD HH:MM:SS` in the CSV streams. Times-of-day are carried as
//! signed second offsets from midnight so that sampling jitter can push a
//! value across a boundary without wrapping.

pub mod recurrence;
pub mod time_profile;

pub use recurrence::{RecurrencePattern, RecurrenceRule};
pub use time_profile::{TimeProfile, TimeProfileEntry};

use crate::error::{ScenarioError, ScenarioResult};
use crate::random::SimRng;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand_distr::{Distribution, Normal};
use std::fmt;

/// Timestamp format used in every CSV stream
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 00:00:00 of the given date
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}

/// 23:59:59 of the given date
pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).expect("23:59:59 is always valid")
}

/// Seconds since midnight of the datetime's own day
pub fn seconds_into_day(dt: NaiveDateTime) -> i64 {
    (dt - day_start(dt.date())).num_seconds()
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> ScenarioResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ScenarioError::data(format!("bad date `{}`: {}", s, e)))
}

/// Parse a `YYYY-MM-DD HH:MM:SS` datetime
pub fn parse_datetime(s: &str) -> ScenarioResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
        .map_err(|e| ScenarioError::data(format!("bad datetime `{}`: {}", s, e)))
}

/// Format a datetime for CSV output
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Seconds since the Unix epoch; interval maps key on this
pub fn epoch_seconds(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Inverse of [`epoch_seconds`]
pub fn from_epoch_seconds(secs: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp(secs, 0)
        .expect("timestamp in range")
        .naive_utc()
}

/// Parse a `HH:MM:SS` time-of-day into a duration since midnight
pub fn parse_hms(s: &str) -> ScenarioResult<Duration> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
        .map_err(|e| ScenarioError::data(format!("bad time `{}`: {}", s, e)))?;
    Ok(t.signed_duration_since(NaiveTime::from_hms_opt(0, 0, 0).expect("midnight")))
}

/// A half-open attendance window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePeriod {
    /// Window start
    pub start: NaiveDateTime,
    /// Window end
    pub end: NaiveDateTime,
}

impl TimePeriod {
    /// Create a period; callers are expected to keep `start <= end`
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Length of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            format_datetime(self.start),
            format_datetime(self.end)
        )
    }
}

/// A time-of-day drawn from a normal distribution: `mean + N(0, stdev)`
#[derive(Debug, Clone, Copy)]
pub struct NormalTime {
    mean: Duration,
    stdev: Duration,
}

impl NormalTime {
    /// Create from mean and standard deviation durations
    pub fn new(mean: Duration, stdev: Duration) -> Self {
        Self { mean, stdev }
    }

    /// Create from `HH:MM:SS` strings
    pub fn parse(mean: &str, stdev: &str) -> ScenarioResult<Self> {
        Ok(Self::new(parse_hms(mean)?, parse_hms(stdev)?))
    }

    /// The distribution mean
    pub fn mean(&self) -> Duration {
        self.mean
    }

    /// The distribution standard deviation
    pub fn stdev(&self) -> Duration {
        self.stdev
    }

    /// Draw one sample
    pub fn sample(&self, rng: &mut SimRng) -> Duration {
        let sigma = self.stdev.num_seconds() as f64;
        let jitter = match Normal::new(0.0, sigma) {
            Ok(distr) => distr.sample(rng) as i64,
            Err(_) => 0,
        };
        self.mean + Duration::seconds(jitter)
    }
}

impl fmt::Display for NormalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N({}s+/-{}s)",
            self.mean.num_seconds(),
            self.stdev.num_seconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::engine;

    #[test]
    fn test_day_boundaries() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_datetime(day_start(d)), "2024-01-15 00:00:00");
        assert_eq!(format_datetime(day_end(d)), "2024-01-15 23:59:59");
        assert_eq!((day_end(d) - day_start(d)).num_seconds(), 86399);
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(parse_hms("00:10:00").unwrap(), Duration::minutes(10));
        assert_eq!(parse_hms("09:00:00").unwrap(), Duration::hours(9));
        assert!(parse_hms("not a time").is_err());
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = parse_datetime("2024-03-01 12:34:56").unwrap();
        assert_eq!(format_datetime(dt), "2024-03-01 12:34:56");
        assert_eq!(seconds_into_day(dt), 12 * 3600 + 34 * 60 + 56);
    }

    #[test]
    fn test_normal_time_zero_stdev_is_exact() {
        let mut rng = engine(Some(3));
        let nt = NormalTime::parse("09:00:00", "00:00:00").unwrap();
        for _ in 0..10 {
            assert_eq!(nt.sample(&mut rng), Duration::hours(9));
        }
    }

    #[test]
    fn test_normal_time_samples_near_mean() {
        let mut rng = engine(Some(4));
        let nt = NormalTime::parse("12:00:00", "00:05:00").unwrap();
        for _ in 0..100 {
            let s = nt.sample(&mut rng).num_seconds();
            // Within 6 sigma of the mean
            assert!((s - 12 * 3600).abs() < 6 * 300);
        }
    }
}
