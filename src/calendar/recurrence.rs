//! Recurrence patterns expanded into explicit date lists
//!
//! A pattern is bounded by a start and end date and carries one of eight
//! period rules. Expansion happens eagerly at construction; queries are a
//! binary search over the sorted, deduplicated date list. Weekdays are
//! encoded 0=Sunday … 6=Saturday throughout the input files.

use crate::error::{ScenarioError, ScenarioResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde_json::Value;

/// The period rule of a recurrence pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// Every `repeat_every` days from the start date
    Day,
    /// The listed weekdays, every `repeat_every` weeks
    Week {
        /// Weekdays, 0=Sunday … 6=Saturday
        days_of_week: Vec<u32>,
    },
    /// The listed days of the month, every `repeat_every` months
    MonthByDay {
        /// Days of month, 1-based; invalid dates (e.g. Feb 31) are skipped
        days_of_month: Vec<u32>,
    },
    /// The n-th weekday of the month, every `repeat_every` months
    MonthByWeek {
        /// Week ordinals within the month, 1-based
        weeks_of_month: Vec<u32>,
        /// Weekdays, 0=Sunday … 6=Saturday
        days_of_week: Vec<u32>,
    },
    /// The listed days of the year, every `repeat_every` years
    YearByDay {
        /// Days of year, 1-based
        days_of_year: Vec<u32>,
    },
    /// ISO-numbered weeks combined with weekdays, every `repeat_every` years
    YearByWeek {
        /// ISO week numbers, 1-based
        weeks_of_year: Vec<u32>,
        /// Weekdays, 0=Sunday … 6=Saturday
        days_of_week: Vec<u32>,
    },
    /// Months-of-year × days-of-month, every `repeat_every` years
    YearByMonthDay {
        /// Months, 1-based
        months_of_year: Vec<u32>,
        /// Days of month, 1-based
        days_of_month: Vec<u32>,
    },
    /// Months-of-year × week ordinals × weekdays, every `repeat_every` years
    YearByMonthWeek {
        /// Months, 1-based
        months_of_year: Vec<u32>,
        /// Week ordinals within the month, 1-based
        weeks_of_month: Vec<u32>,
        /// Weekdays, 0=Sunday … 6=Saturday
        days_of_week: Vec<u32>,
    },
}

/// A recurrence pattern with its eagerly expanded date list
#[derive(Debug, Clone)]
pub struct RecurrencePattern {
    /// First date the pattern can produce
    pub start: NaiveDate,
    /// Last date the pattern can produce
    pub end: NaiveDate,
    /// Period multiplier (every N days/weeks/months/years)
    pub repeat_every: u32,
    /// The period rule
    pub rule: RecurrenceRule,
    dates: Vec<NaiveDate>,
}

/// Map the 0=Sunday … 6=Saturday encoding onto a chrono weekday
fn weekday_from_index(idx: u32) -> ScenarioResult<Weekday> {
    Ok(match idx {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        other => {
            return Err(ScenarioError::data(format!(
                "day-of-week {} out of range 0..=6",
                other
            )))
        }
    })
}

/// Index of a chrono weekday in the 0=Sunday encoding
fn weekday_index(wd: Weekday) -> u32 {
    wd.num_days_from_sunday()
}

/// The n-th (1-based) occurrence of a weekday within a month, if it exists
fn nth_weekday_of_month(year: i32, month: u32, wd: Weekday, nth: u32) -> Option<NaiveDate> {
    if nth == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (weekday_index(wd) + 7 - weekday_index(first.weekday())) % 7;
    let day = 1 + offset + 7 * (nth - 1);
    NaiveDate::from_ymd_opt(year, month, day)
}

impl RecurrencePattern {
    /// Build a pattern and expand its date list
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        repeat_every: u32,
        rule: RecurrenceRule,
    ) -> ScenarioResult<Self> {
        let mut pattern = Self {
            start,
            end,
            repeat_every: repeat_every.max(1),
            rule,
            dates: Vec::new(),
        };
        pattern.expand()?;
        Ok(pattern)
    }

    /// Parse the `pattern` object of a time-profile entry
    pub fn from_json(v: &Value) -> ScenarioResult<Self> {
        let start = crate::calendar::parse_date(str_field(v, "start-date")?)?;
        let end = crate::calendar::parse_date(str_field(v, "end-date")?)?;
        let period = str_field(v, "period")?;
        let det = v
            .get("period-details")
            .ok_or_else(|| ScenarioError::data("pattern missing `period-details`"))?;
        let repeat_every = det
            .get("repeat-every")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;

        let rule = match period.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('d') => RecurrenceRule::Day,
            Some('w') => RecurrenceRule::Week {
                days_of_week: u32_list(det, "days-of-week")?,
            },
            Some('m') => {
                if det.get("days-of-month").is_some() {
                    RecurrenceRule::MonthByDay {
                        days_of_month: u32_list(det, "days-of-month")?,
                    }
                } else {
                    RecurrenceRule::MonthByWeek {
                        weeks_of_month: u32_list(det, "weeks-of-month")?,
                        days_of_week: u32_list(det, "days-of-week")?,
                    }
                }
            }
            Some('y') => {
                if det.get("days-of-year").is_some() {
                    RecurrenceRule::YearByDay {
                        days_of_year: u32_list(det, "days-of-year")?,
                    }
                } else if det.get("weeks-of-year").is_some() {
                    RecurrenceRule::YearByWeek {
                        weeks_of_year: u32_list(det, "weeks-of-year")?,
                        days_of_week: u32_list(det, "days-of-week")?,
                    }
                } else if det.get("days-of-month").is_some() {
                    RecurrenceRule::YearByMonthDay {
                        months_of_year: u32_list(det, "months-of-year")?,
                        days_of_month: u32_list(det, "days-of-month")?,
                    }
                } else {
                    RecurrenceRule::YearByMonthWeek {
                        months_of_year: u32_list(det, "months-of-year")?,
                        weeks_of_month: u32_list(det, "weeks-of-month")?,
                        days_of_week: u32_list(det, "days-of-week")?,
                    }
                }
            }
            _ => {
                return Err(ScenarioError::data(format!(
                    "pattern period `{}` not recognized",
                    period
                )))
            }
        };

        Self::new(start, end, repeat_every, rule)
    }

    /// The expanded, sorted, deduplicated date list
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Whether the pattern produces the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    fn push_in_range(&mut self, date: NaiveDate) {
        if date >= self.start && date <= self.end {
            self.dates.push(date);
        }
    }

    /// Calendar months of the pattern window stepped by `repeat_every`
    fn month_steps(&self) -> Vec<(i32, u32)> {
        let mut out = Vec::new();
        let mut index = self.start.year() * 12 + self.start.month() as i32 - 1;
        let last = self.end.year() * 12 + self.end.month() as i32 - 1;
        while index <= last {
            out.push((index.div_euclid(12), index.rem_euclid(12) as u32 + 1));
            index += self.repeat_every as i32;
        }
        out
    }

    /// Calendar years of the pattern window stepped by `repeat_every`
    fn year_steps(&self) -> Vec<i32> {
        (self.start.year()..=self.end.year())
            .step_by(self.repeat_every as usize)
            .collect()
    }

    fn expand(&mut self) -> ScenarioResult<()> {
        match self.rule.clone() {
            RecurrenceRule::Day => {
                let mut curr = self.start;
                while curr <= self.end {
                    self.dates.push(curr);
                    curr += Duration::days(self.repeat_every as i64);
                }
            }
            RecurrenceRule::Week { days_of_week } => {
                let start_dow = weekday_index(self.start.weekday());
                for dow in days_of_week {
                    weekday_from_index(dow)?;
                    let diff = (dow + 7 - start_dow) % 7;
                    let mut curr = self.start + Duration::days(diff as i64);
                    while curr <= self.end {
                        self.dates.push(curr);
                        curr += Duration::days(7 * self.repeat_every as i64);
                    }
                }
            }
            RecurrenceRule::MonthByDay { days_of_month } => {
                for (year, month) in self.month_steps() {
                    for &dom in &days_of_month {
                        if let Some(d) = NaiveDate::from_ymd_opt(year, month, dom) {
                            self.push_in_range(d);
                        }
                    }
                }
            }
            RecurrenceRule::MonthByWeek {
                weeks_of_month,
                days_of_week,
            } => {
                for (year, month) in self.month_steps() {
                    for &week in &weeks_of_month {
                        for &dow in &days_of_week {
                            let wd = weekday_from_index(dow)?;
                            if let Some(d) = nth_weekday_of_month(year, month, wd, week) {
                                self.push_in_range(d);
                            }
                        }
                    }
                }
            }
            RecurrenceRule::YearByDay { days_of_year } => {
                for year in self.year_steps() {
                    for &doy in &days_of_year {
                        if let Some(d) = NaiveDate::from_yo_opt(year, doy) {
                            self.push_in_range(d);
                        }
                    }
                }
            }
            RecurrenceRule::YearByWeek {
                weeks_of_year,
                days_of_week,
            } => {
                for year in self.year_steps() {
                    for &week in &weeks_of_year {
                        for &dow in &days_of_week {
                            let wd = weekday_from_index(dow)?;
                            if let Some(d) = NaiveDate::from_isoywd_opt(year, week, wd) {
                                self.push_in_range(d);
                            }
                        }
                    }
                }
            }
            RecurrenceRule::YearByMonthDay {
                months_of_year,
                days_of_month,
            } => {
                for year in self.year_steps() {
                    for &month in &months_of_year {
                        for &dom in &days_of_month {
                            if let Some(d) = NaiveDate::from_ymd_opt(year, month, dom) {
                                self.push_in_range(d);
                            }
                        }
                    }
                }
            }
            RecurrenceRule::YearByMonthWeek {
                months_of_year,
                weeks_of_month,
                days_of_week,
            } => {
                for year in self.year_steps() {
                    for &month in &months_of_year {
                        for &week in &weeks_of_month {
                            for &dow in &days_of_week {
                                let wd = weekday_from_index(dow)?;
                                if let Some(d) = nth_weekday_of_month(year, month, wd, week) {
                                    self.push_in_range(d);
                                }
                            }
                        }
                    }
                }
            }
        }

        self.dates.sort_unstable();
        self.dates.dedup();
        Ok(())
    }
}

fn str_field<'a>(v: &'a Value, key: &str) -> ScenarioResult<&'a str> {
    v.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ScenarioError::data(format!("pattern missing string field `{}`", key)))
}

fn u32_list(v: &Value, key: &str) -> ScenarioResult<Vec<u32>> {
    let arr = v
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ScenarioError::data(format!("pattern missing array field `{}`", key)))?;
    arr.iter()
        .map(|x| {
            x.as_u64()
                .map(|n| n as u32)
                .ok_or_else(|| ScenarioError::data(format!("non-integer entry in `{}`", key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_daily_expansion() {
        let p =
            RecurrencePattern::new(d(2024, 1, 1), d(2024, 1, 10), 3, RecurrenceRule::Day).unwrap();
        assert_eq!(
            p.dates(),
            &[d(2024, 1, 1), d(2024, 1, 4), d(2024, 1, 7), d(2024, 1, 10)]
        );
    }

    #[test]
    fn test_weekly_expansion() {
        // 2024-01-01 is a Monday; ask for Mondays (1) and Fridays (5)
        let p = RecurrencePattern::new(
            d(2024, 1, 1),
            d(2024, 1, 14),
            1,
            RecurrenceRule::Week {
                days_of_week: vec![1, 5],
            },
        )
        .unwrap();
        assert_eq!(
            p.dates(),
            &[d(2024, 1, 1), d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 12)]
        );
    }

    #[test]
    fn test_month_by_day_skips_invalid() {
        let p = RecurrencePattern::new(
            d(2024, 1, 1),
            d(2024, 4, 30),
            1,
            RecurrenceRule::MonthByDay {
                days_of_month: vec![31],
            },
        )
        .unwrap();
        // February and April have no 31st
        assert_eq!(p.dates(), &[d(2024, 1, 31), d(2024, 3, 31)]);
    }

    #[test]
    fn test_month_by_week_second_tuesday() {
        let p = RecurrencePattern::new(
            d(2024, 1, 1),
            d(2024, 3, 31),
            1,
            RecurrenceRule::MonthByWeek {
                weeks_of_month: vec![2],
                days_of_week: vec![2],
            },
        )
        .unwrap();
        assert_eq!(p.dates(), &[d(2024, 1, 9), d(2024, 2, 13), d(2024, 3, 12)]);
    }

    #[test]
    fn test_year_by_day() {
        let p = RecurrencePattern::new(
            d(2023, 1, 1),
            d(2024, 12, 31),
            1,
            RecurrenceRule::YearByDay {
                days_of_year: vec![1, 60],
            },
        )
        .unwrap();
        // Day 60 is Mar 1 in a common year, Feb 29 in a leap year
        assert_eq!(
            p.dates(),
            &[d(2023, 1, 1), d(2023, 3, 1), d(2024, 1, 1), d(2024, 2, 29)]
        );
    }

    #[test]
    fn test_year_by_week_iso() {
        let p = RecurrencePattern::new(
            d(2024, 1, 1),
            d(2024, 12, 31),
            1,
            RecurrenceRule::YearByWeek {
                weeks_of_year: vec![2],
                days_of_week: vec![3],
            },
        )
        .unwrap();
        // ISO week 2 of 2024: Mon Jan 8 .. Sun Jan 14; Wednesday = Jan 10
        assert_eq!(p.dates(), &[d(2024, 1, 10)]);
    }

    #[test]
    fn test_expansion_is_sorted_unique_and_bounded() {
        let p = RecurrencePattern::new(
            d(2024, 1, 5),
            d(2024, 2, 20),
            1,
            RecurrenceRule::MonthByDay {
                days_of_month: vec![1, 10, 25],
            },
        )
        .unwrap();
        let dates = p.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates.iter().all(|x| *x >= p.start && *x <= p.end));
        assert_eq!(dates, &[d(2024, 1, 10), d(2024, 1, 25), d(2024, 2, 1), d(2024, 2, 10)]);
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let make = || {
            RecurrencePattern::new(
                d(2024, 1, 1),
                d(2024, 6, 30),
                2,
                RecurrenceRule::Week {
                    days_of_week: vec![1, 3, 5],
                },
            )
            .unwrap()
        };
        assert_eq!(make().dates(), make().dates());
    }

    #[test]
    fn test_contains_uses_binary_search() {
        let p =
            RecurrencePattern::new(d(2024, 1, 1), d(2024, 1, 31), 2, RecurrenceRule::Day).unwrap();
        assert!(p.contains(d(2024, 1, 1)));
        assert!(p.contains(d(2024, 1, 3)));
        assert!(!p.contains(d(2024, 1, 2)));
        assert!(!p.contains(d(2024, 2, 1)));
    }

    #[test]
    fn test_from_json_week_pattern() {
        let v: Value = serde_json::from_str(
            r#"{
                "start-date": "2024-01-01",
                "end-date": "2024-01-31",
                "period": "week",
                "period-details": {"repeat-every": 1, "days-of-week": [1, 2, 3, 4, 5]}
            }"#,
        )
        .unwrap();
        let p = RecurrencePattern::from_json(&v).unwrap();
        // January 2024 has 23 weekdays
        assert_eq!(p.dates().len(), 23);
    }

    #[test]
    fn test_from_json_unknown_period_is_data_error() {
        let v: Value = serde_json::from_str(
            r#"{
                "start-date": "2024-01-01",
                "end-date": "2024-01-31",
                "period": "fortnight",
                "period-details": {}
            }"#,
        )
        .unwrap();
        assert!(RecurrencePattern::from_json(&v).is_err());
    }
}
