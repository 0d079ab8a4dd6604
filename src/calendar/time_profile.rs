//! Time profiles: recurrence patterns paired with sampled daily windows
//!
//! A profile is an ordered list of entries. Querying walks the entries until
//! one whose pattern contains the anchor date, then samples that entry's
//! start/end/required distributions. With `use_eta` the anchor time skews the
//! window (scheduling an attendance from "now"); without it the query only
//! probes whether and when the subject is active that day.

use crate::calendar::{day_start, NormalTime, RecurrencePattern, TimePeriod};
use crate::error::{ScenarioError, ScenarioResult};
use crate::random::SimRng;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use serde_json::Value;

/// Default stdev applied when `required` is not specified
const DEFAULT_REQUIRED_STDEV: &str = "00:10:00";

/// One entry of a time profile
#[derive(Debug, Clone)]
pub struct TimeProfileEntry {
    /// The dates this entry is active on
    pub pattern: RecurrencePattern,
    /// Window start distribution
    pub start: NormalTime,
    /// Window end distribution
    pub end: NormalTime,
    /// Required attendance duration distribution
    pub required: NormalTime,
    /// Whether attendances under this entry recur
    pub recurring: bool,
}

/// An ordered list of time-profile entries
#[derive(Debug, Clone, Default)]
pub struct TimeProfile {
    entries: Vec<TimeProfileEntry>,
}

impl TimeProfile {
    /// Build a profile from entries
    pub fn new(entries: Vec<TimeProfileEntry>) -> Self {
        Self { entries }
    }

    /// Parse the JSON array of `{pattern, duration}` entries
    pub fn from_json(list: &Value) -> ScenarioResult<Self> {
        let arr = list
            .as_array()
            .ok_or_else(|| ScenarioError::data("time profile must be a JSON array"))?;
        let mut entries = Vec::with_capacity(arr.len());
        for v in arr {
            let pattern = RecurrencePattern::from_json(
                v.get("pattern")
                    .ok_or_else(|| ScenarioError::data("profile entry missing `pattern`"))?,
            )?;
            let duration = v
                .get("duration")
                .ok_or_else(|| ScenarioError::data("profile entry missing `duration`"))?;

            let start = parse_normal_time(duration, "start-time")?;
            let end = parse_normal_time(duration, "end-time")?;
            let required = match duration.get("required") {
                Some(_) => parse_normal_time(duration, "required")?,
                // Fall back to the gap between mean times
                None => NormalTime::new(
                    end.mean() - start.mean(),
                    crate::calendar::parse_hms(DEFAULT_REQUIRED_STDEV)?,
                ),
            };
            let recurring = duration
                .get("recurring")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                != 0;

            entries.push(TimeProfileEntry {
                pattern,
                start,
                end,
                required,
                recurring,
            });
        }
        Ok(Self::new(entries))
    }

    /// The profile entries
    pub fn entries(&self) -> &[TimeProfileEntry] {
        &self.entries
    }

    /// Sample a window for the anchor's date, or `None` if no entry matches
    /// or every matching entry rejects its samples.
    ///
    /// With `use_eta`, the anchor time is an earliest-arrival bound: windows
    /// starting well after the anchor, ending before it, or too short for the
    /// required duration are rejected, and the returned window runs from
    /// `max(start, anchor)` for exactly the required duration. Without
    /// `use_eta`, a required-length window is placed uniformly at random
    /// inside the sampled `[start, end]` range.
    pub fn query(
        &self,
        anchor: NaiveDateTime,
        use_eta: bool,
        rng: &mut SimRng,
    ) -> Option<TimePeriod> {
        let date = anchor.date();
        let midnight = day_start(date);
        let anchor_time = anchor - midnight;

        for entry in &self.entries {
            if !entry.pattern.contains(date) {
                continue;
            }

            if use_eta {
                let mut start = entry.start.sample(rng);
                if anchor_time + entry.start.stdev() < start {
                    continue; // anchor is too early for this window
                }
                start = start.max(anchor_time);

                let end = entry.end.sample(rng);
                if start > end {
                    continue;
                }

                let required = entry.required.sample(rng);
                if required <= Duration::zero() {
                    continue;
                }
                let new_end = start + required;
                if new_end > end {
                    continue; // cannot fit the required duration
                }

                return Some(TimePeriod::new(midnight + start, midnight + new_end));
            } else {
                let start = entry.start.sample(rng);
                let end = entry.end.sample(rng);
                if start > end {
                    continue;
                }

                let required = entry.required.sample(rng);
                if required <= Duration::zero() {
                    continue;
                }
                let slack = (end - required - start).num_seconds();
                if slack < 0 {
                    continue;
                }

                let offset = Duration::seconds(rng.gen_range(0..=slack));
                let placed = start + offset;
                return Some(TimePeriod::new(
                    midnight + placed,
                    midnight + placed + required,
                ));
            }
        }

        None
    }
}

/// Read a `NormalTime` field that is either `[mean, stdev]` or a plain
/// `"HH:MM:SS"` string with a sibling `<key>-stdev` field
fn parse_normal_time(duration: &Value, key: &str) -> ScenarioResult<NormalTime> {
    match duration.get(key) {
        Some(Value::Array(pair)) => {
            let mean = pair
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| ScenarioError::data(format!("`{}` mean must be a string", key)))?;
            let stdev = pair
                .get(1)
                .and_then(Value::as_str)
                .ok_or_else(|| ScenarioError::data(format!("`{}` stdev must be a string", key)))?;
            NormalTime::parse(mean, stdev)
        }
        Some(Value::String(mean)) => {
            let stdev_key = format!("{}-stdev", key);
            let stdev = duration
                .get(&stdev_key)
                .and_then(Value::as_str)
                .unwrap_or("00:00:00");
            NormalTime::parse(mean, stdev)
        }
        _ => Err(ScenarioError::data(format!(
            "duration missing time field `{}`",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_datetime;
    use crate::random::engine;

    fn daily_profile(start: &str, end: &str, required: &str) -> TimeProfile {
        let json = format!(
            r#"[{{
                "pattern": {{
                    "start-date": "2024-01-01",
                    "end-date": "2024-12-31",
                    "period": "day",
                    "period-details": {{"repeat-every": 1}}
                }},
                "duration": {{
                    "start-time": ["{start}", "00:00:00"],
                    "end-time": ["{end}", "00:00:00"],
                    "required": ["{required}", "00:00:00"]
                }}
            }}]"#
        );
        TimeProfile::from_json(&serde_json::from_str(&json).unwrap()).unwrap()
    }

    #[test]
    fn test_query_misses_out_of_pattern_date() {
        let mut rng = engine(Some(1));
        let tp = daily_profile("09:00:00", "17:00:00", "08:00:00");
        let anchor = parse_datetime("2023-06-01 00:00:00").unwrap();
        assert!(tp.query(anchor, false, &mut rng).is_none());
    }

    #[test]
    fn test_query_active_day_fills_window() {
        let mut rng = engine(Some(2));
        let tp = daily_profile("09:00:00", "17:00:00", "08:00:00");
        let anchor = parse_datetime("2024-03-04 00:00:00").unwrap();
        let period = tp.query(anchor, false, &mut rng).unwrap();
        // Exact distributions leave no slack: the window is 09:00-17:00
        assert_eq!(period.start, parse_datetime("2024-03-04 09:00:00").unwrap());
        assert_eq!(period.end, parse_datetime("2024-03-04 17:00:00").unwrap());
    }

    #[test]
    fn test_query_places_required_inside_window() {
        let mut rng = engine(Some(3));
        let tp = daily_profile("09:00:00", "17:00:00", "01:00:00");
        let anchor = parse_datetime("2024-03-04 00:00:00").unwrap();
        let lo = parse_datetime("2024-03-04 09:00:00").unwrap();
        let hi = parse_datetime("2024-03-04 17:00:00").unwrap();
        for _ in 0..50 {
            let period = tp.query(anchor, false, &mut rng).unwrap();
            assert_eq!(period.duration(), Duration::hours(1));
            assert!(period.start >= lo && period.end <= hi);
        }
    }

    #[test]
    fn test_query_eta_starts_at_anchor() {
        let mut rng = engine(Some(4));
        let tp = daily_profile("09:00:00", "17:00:00", "02:00:00");
        let anchor = parse_datetime("2024-03-04 10:30:00").unwrap();
        let period = tp.query(anchor, true, &mut rng).unwrap();
        assert_eq!(period.start, anchor);
        assert_eq!(period.end, parse_datetime("2024-03-04 12:30:00").unwrap());
    }

    #[test]
    fn test_query_eta_rejects_too_early_anchor() {
        let mut rng = engine(Some(5));
        let tp = daily_profile("09:00:00", "17:00:00", "02:00:00");
        // Zero stdev: any anchor before 09:00 is too early
        let anchor = parse_datetime("2024-03-04 06:00:00").unwrap();
        assert!(tp.query(anchor, true, &mut rng).is_none());
    }

    #[test]
    fn test_query_eta_rejects_window_overflow() {
        let mut rng = engine(Some(6));
        let tp = daily_profile("09:00:00", "17:00:00", "02:00:00");
        // 16:00 + 2h required > 17:00 end
        let anchor = parse_datetime("2024-03-04 16:00:00").unwrap();
        assert!(tp.query(anchor, true, &mut rng).is_none());
    }

    #[test]
    fn test_query_rejects_required_longer_than_window() {
        let mut rng = engine(Some(7));
        let tp = daily_profile("09:00:00", "10:00:00", "02:00:00");
        let anchor = parse_datetime("2024-03-04 00:00:00").unwrap();
        assert!(tp.query(anchor, false, &mut rng).is_none());
    }

    #[test]
    fn test_required_defaults_to_window_gap() {
        let json = r#"[{
            "pattern": {
                "start-date": "2024-01-01",
                "end-date": "2024-12-31",
                "period": "day",
                "period-details": {"repeat-every": 1}
            },
            "duration": {
                "start-time": ["09:00:00", "00:00:00"],
                "end-time": ["17:00:00", "00:00:00"]
            }
        }]"#;
        let tp = TimeProfile::from_json(&serde_json::from_str(json).unwrap()).unwrap();
        let entry = &tp.entries()[0];
        assert_eq!(entry.required.mean(), Duration::hours(8));
        assert_eq!(entry.required.stdev(), Duration::minutes(10));
    }

    #[test]
    fn test_scalar_time_with_stdev_sibling() {
        let json = r#"[{
            "pattern": {
                "start-date": "2024-01-01",
                "end-date": "2024-12-31",
                "period": "day",
                "period-details": {}
            },
            "duration": {
                "start-time": "08:00:00",
                "start-time-stdev": "00:30:00",
                "end-time": "18:00:00",
                "end-time-stdev": "00:15:00",
                "recurring": 1
            }
        }]"#;
        let tp = TimeProfile::from_json(&serde_json::from_str(json).unwrap()).unwrap();
        let entry = &tp.entries()[0];
        assert_eq!(entry.start.stdev(), Duration::minutes(30));
        assert_eq!(entry.end.stdev(), Duration::minutes(15));
        assert!(entry.recurring);
    }
}
