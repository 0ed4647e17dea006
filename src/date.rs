//! Day-granularity dates for `:date(...)` query clauses.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate, Utc};

/// A date literal as written in a query. Relative keywords are resolved at
/// evaluation time, not at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDate {
    Absolute(NaiveDate),
    Now,
    Tomorrow,
    Yesterday,
}

impl QueryDate {
    /// Build from day/month/year as written (`d/m/yy` or `d/m/yyyy`).
    /// Two-digit years below 70 map to 20xx, the rest to 19xx.
    pub fn from_dmy(day: u32, month: u32, year: i32) -> Option<Self> {
        let year = if year < 100 {
            if year < 70 {
                2000 + year
            } else {
                1900 + year
            }
        } else {
            year
        };
        NaiveDate::from_ymd_opt(year, month, day).map(QueryDate::Absolute)
    }

    pub fn resolve(&self) -> NaiveDate {
        let today = Utc::now().date_naive();
        match self {
            QueryDate::Absolute(d) => *d,
            QueryDate::Now => today,
            QueryDate::Tomorrow => today.checked_add_days(Days::new(1)).unwrap_or(today),
            QueryDate::Yesterday => today.checked_sub_days(Days::new(1)).unwrap_or(today),
        }
    }
}

impl fmt::Display for QueryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryDate::Absolute(d) => {
                write!(f, "{}/{}/{}", d.day(), d.month(), d.year())
            }
            QueryDate::Now => write!(f, "now"),
            QueryDate::Tomorrow => write!(f, "tomorrow"),
            QueryDate::Yesterday => write!(f, "yesterday"),
        }
    }
}

/// The predicate a document's modification date must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePredicate {
    /// Exactly that day.
    On(QueryDate),
    /// Strictly before that day.
    Before(QueryDate),
    /// Strictly after that day.
    After(QueryDate),
    /// Inclusive day range.
    Between(QueryDate, QueryDate),
}

impl DatePredicate {
    /// Check a unix timestamp (seconds) against the predicate, at day
    /// granularity in UTC.
    pub fn matches(&self, timestamp: i64) -> bool {
        let Some(date) = chrono::DateTime::from_timestamp(timestamp, 0).map(|t| t.date_naive())
        else {
            return false;
        };
        match self {
            DatePredicate::On(d) => date == d.resolve(),
            DatePredicate::Before(d) => date < d.resolve(),
            DatePredicate::After(d) => date > d.resolve(),
            DatePredicate::Between(a, b) => {
                let (lo, hi) = (a.resolve(), b.resolve());
                lo <= date && date <= hi
            }
        }
    }
}

impl fmt::Display for DatePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePredicate::On(d) => write!(f, "{d}"),
            DatePredicate::Before(d) => write!(f, "<{d}"),
            DatePredicate::After(d) => write!(f, ">{d}"),
            DatePredicate::Between(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(date: NaiveDate) -> i64 {
        date.and_hms_opt(12, 0, 0)
            .expect("valid time")
            .and_utc()
            .timestamp()
    }

    #[test]
    fn test_from_dmy_two_digit_years() {
        assert_eq!(
            QueryDate::from_dmy(1, 2, 24),
            Some(QueryDate::Absolute(
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
            ))
        );
        assert_eq!(
            QueryDate::from_dmy(1, 2, 85),
            Some(QueryDate::Absolute(
                NaiveDate::from_ymd_opt(1985, 2, 1).unwrap()
            ))
        );
        assert_eq!(QueryDate::from_dmy(32, 1, 2024), None);
    }

    #[test]
    fn test_predicates_day_granularity() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let date = QueryDate::Absolute(day);

        assert!(DatePredicate::On(date).matches(ts(day)));
        assert!(!DatePredicate::Before(date).matches(ts(day)));
        assert!(!DatePredicate::After(date).matches(ts(day)));

        let before = day.pred_opt().unwrap();
        assert!(DatePredicate::Before(date).matches(ts(before)));
        let after = day.succ_opt().unwrap();
        assert!(DatePredicate::After(date).matches(ts(after)));
    }

    #[test]
    fn test_range_is_inclusive() {
        let lo = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let hi = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let pred = DatePredicate::Between(QueryDate::Absolute(lo), QueryDate::Absolute(hi));

        assert!(pred.matches(ts(lo)));
        assert!(pred.matches(ts(hi)));
        assert!(pred.matches(ts(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())));
        assert!(!pred.matches(ts(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())));
    }

    #[test]
    fn test_relative_dates_resolve() {
        assert!(DatePredicate::On(QueryDate::Now).matches(Utc::now().timestamp()));
        assert!(DatePredicate::Before(QueryDate::Tomorrow).matches(Utc::now().timestamp()));
        assert!(DatePredicate::After(QueryDate::Yesterday).matches(Utc::now().timestamp()));
    }

    #[test]
    fn test_display_round_trip_shape() {
        let d = QueryDate::from_dmy(5, 7, 2023).unwrap();
        assert_eq!(d.to_string(), "5/7/2023");
        assert_eq!(DatePredicate::Before(d).to_string(), "<5/7/2023");
    }
}
