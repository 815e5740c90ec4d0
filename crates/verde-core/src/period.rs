//! # Period Resolver
//!
//! A `Period` is the typed date-range value object passed through the
//! aggregator, bucketizer and batch coordinator — it replaces ad-hoc
//! date-string plumbing. Boundaries are inclusive calendar days.
//!
//! Month resolution uses calendar arithmetic (first day of the month,
//! day before the first of the next month), so leap years and 28/29/30/31
//! day months fall out for free — never a fixed-day table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Wire format for period boundaries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Creates a period after validating `start ≤ end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidPeriod(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Period { start, end })
    }

    /// A single-day period.
    pub fn single_day(date: NaiveDate) -> Self {
        Period { start: date, end: date }
    }

    /// Resolves a (year, month) pair to the first and last calendar day
    /// of that month.
    ///
    /// ## Example
    /// ```rust
    /// use verde_core::period::Period;
    ///
    /// let feb = Period::for_month(2024, 2).unwrap();
    /// assert_eq!(feb.end().to_string(), "2024-02-29"); // leap year
    /// ```
    pub fn for_month(year: i32, month: u32) -> CoreResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            CoreError::InvalidPeriod(format!("{year}-{month} is not a calendar month"))
        })?;

        // First day of the following month, stepped back one day.
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| {
                CoreError::InvalidPeriod(format!("{year}-{month} has no last day"))
            })?;

        Ok(Period { start, end })
    }

    /// Parses explicit `YYYY-MM-DD` boundaries.
    pub fn parse(start: &str, end: &str) -> CoreResult<Self> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        Period::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether a calendar date falls inside the period (inclusive).
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parses a `YYYY-MM-DD` date, reporting failures as `InvalidPeriod`.
pub fn parse_date(input: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| {
        CoreError::InvalidPeriod(format!("'{input}' is not a YYYY-MM-DD calendar date"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_month_regular_lengths() {
        let jan = Period::for_month(2025, 1).unwrap();
        assert_eq!(jan.start().to_string(), "2025-01-01");
        assert_eq!(jan.end().to_string(), "2025-01-31");

        let apr = Period::for_month(2025, 4).unwrap();
        assert_eq!(apr.end().to_string(), "2025-04-30");

        let dec = Period::for_month(2025, 12).unwrap();
        assert_eq!(dec.end().to_string(), "2025-12-31");
    }

    #[test]
    fn test_for_month_february_honors_leap_years() {
        assert_eq!(
            Period::for_month(2024, 2).unwrap().end().to_string(),
            "2024-02-29"
        );
        assert_eq!(
            Period::for_month(2023, 2).unwrap().end().to_string(),
            "2023-02-28"
        );
        assert_eq!(
            Period::for_month(2000, 2).unwrap().end().to_string(),
            "2000-02-29"
        );
        assert_eq!(
            Period::for_month(1900, 2).unwrap().end().to_string(),
            "1900-02-28"
        );
    }

    #[test]
    fn test_for_month_rejects_bad_months() {
        assert!(Period::for_month(2025, 0).is_err());
        assert!(Period::for_month(2025, 13).is_err());
    }

    #[test]
    fn test_explicit_range_passthrough() {
        let p = Period::parse("2025-01-05", "2025-02-10").unwrap();
        assert_eq!(p.start().to_string(), "2025-01-05");
        assert_eq!(p.end().to_string(), "2025-02-10");
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(Period::parse("2025-02-10", "2025-01-05").is_err());
    }

    #[test]
    fn test_unparseable_bound_rejected() {
        assert!(Period::parse("2025-13-01", "2025-12-31").is_err());
        assert!(Period::parse("not-a-date", "2025-12-31").is_err());
        assert!(Period::parse("2025-02-30", "2025-03-01").is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let p = Period::parse("2025-01-01", "2025-01-31").unwrap();
        assert!(p.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(p.contains(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
    }
}
