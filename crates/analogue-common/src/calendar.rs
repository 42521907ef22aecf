//! Calendar utilities shared by every stage of the search.
//!
//! All date arithmetic goes through [`chrono::NaiveDate`]; nothing slices
//! `YYYY-MM-DD` strings by hand.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AnalogueError, Result};

/// Parse a calendar date from ISO 8601 text.
///
/// Supports:
/// - Date only: "2020-02-08"
/// - Datetime without timezone: "2020-02-08T12:00:00" (time discarded)
/// - RFC 3339: "2020-02-08T00:00:00Z" (time discarded)
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ndt.date());
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(AnalogueError::invalid_field(
        "date",
        format!("'{}' is not an ISO 8601 date", s),
    ))
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// True when `date` lies within `radius` days of `center` (inclusive).
pub fn within_days(date: NaiveDate, center: NaiveDate, radius: u32) -> bool {
    days_between(center, date).abs() <= i64::from(radius)
}

/// An inclusive range of calendar years, e.g. a past or present period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl YearRange {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
        }
    }

    /// Check the range is not inverted.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(AnalogueError::invalid_field(
                name,
                format!(
                    "start_year {} is after end_year {}",
                    self.start_year, self.end_year
                ),
            ));
        }
        Ok(())
    }

    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.contains_year(date.year())
    }

    /// True if the two ranges share at least one year.
    pub fn overlaps(&self, other: &YearRange) -> bool {
        self.start_year <= other.end_year && other.start_year <= self.end_year
    }

    /// Number of years covered.
    pub fn len(&self) -> usize {
        (self.end_year - self.start_year + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year)
    }
}

/// Offsets beyond this many seconds (about 317 million years) are rejected.
const MAX_OFFSET_SECONDS: f64 = 1.0e16;

/// A CF-convention time axis definition ("days since 1900-01-01", ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Length of one unit in seconds.
    pub seconds_per_unit: f64,
    /// Reference instant the offsets count from.
    pub epoch: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF `units` attribute such as `hours since 1900-01-01 00:00:00.0`.
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = || {
            AnalogueError::invalid_field(
                "time.units",
                format!("unsupported CF time units '{}'", units),
            )
        };

        let (unit, rest) = units.trim().split_once(" since ").ok_or_else(invalid)?;
        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "days" | "day" | "d" => 86_400.0,
            "hours" | "hour" | "h" => 3_600.0,
            "minutes" | "minute" | "min" => 60.0,
            "seconds" | "second" | "s" => 1.0,
            _ => return Err(invalid()),
        };

        let rest = rest.trim().trim_end_matches('Z');
        // Drop fractional seconds ("00:00:00.0") before parsing
        let rest = match rest.split_once('.') {
            Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head,
            _ => rest,
        };

        let epoch = NaiveDateTime::parse_from_str(rest, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(rest, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| NaiveDateTime::parse_from_str(rest, "%Y-%m-%d %H:%M"))
            .or_else(|_| {
                NaiveDate::parse_from_str(rest, "%Y-%m-%d")
                    .map(|d| d.and_time(NaiveTime::default()))
            })
            .map_err(|_| invalid())?;

        Ok(Self {
            seconds_per_unit,
            epoch,
        })
    }

    /// Convert an offset on this axis to the calendar date it falls on.
    pub fn to_date(&self, offset: f64) -> Option<NaiveDate> {
        let seconds = (offset * self.seconds_per_unit).round();
        // Fill values such as 9.97e36 would saturate the cast.
        if !seconds.is_finite() || seconds.abs() >= MAX_OFFSET_SECONDS {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::try_seconds(seconds as i64)?)
            .map(|dt| dt.date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-02-08").unwrap(), ymd(2020, 2, 8));
        assert_eq!(parse_date("2020-02-08T12:00:00").unwrap(), ymd(2020, 2, 8));
        assert_eq!(parse_date("2020-02-08T00:00:00Z").unwrap(), ymd(2020, 2, 8));
        assert!(parse_date("08/02/2020").is_err());
        assert!(parse_date("2021-02-29").is_err());
    }

    #[test]
    fn test_within_days() {
        let center = ymd(2020, 2, 8);
        assert!(within_days(ymd(2020, 2, 1), center, 7));
        assert!(within_days(ymd(2020, 2, 15), center, 7));
        assert!(!within_days(ymd(2020, 2, 16), center, 7));
        assert!(within_days(center, center, 0));
    }

    #[test]
    fn test_year_range() {
        let past = YearRange::new(1948, 1987);
        let present = YearRange::new(1988, 2026);
        assert!(!past.overlaps(&present));
        assert!(past.overlaps(&YearRange::new(1987, 1990)));
        assert!(present.contains(ymd(2020, 2, 8)));
        assert_eq!(past.len(), 40);
        assert!(YearRange::new(2000, 1990).validate("periods.past").is_err());
    }

    #[test]
    fn test_cf_time_units() {
        let units = CfTimeUnits::parse("hours since 1900-01-01 00:00:00.0").unwrap();
        assert_eq!(units.to_date(24.0 * 365.0), Some(ymd(1901, 1, 1)));

        let days = CfTimeUnits::parse("days since 1950-01-01").unwrap();
        assert_eq!(days.to_date(0.0), Some(ymd(1950, 1, 1)));
        assert_eq!(days.to_date(31.5), Some(ymd(1950, 2, 1)));

        assert!(CfTimeUnits::parse("fortnights since 1950-01-01").is_err());
        assert!(CfTimeUnits::parse("days").is_err());
    }

    #[test]
    fn test_cf_fill_offsets_are_rejected() {
        let units = CfTimeUnits::parse("hours since 1900-01-01 00:00:00").unwrap();
        assert_eq!(units.to_date(9.969209968386869e36), None);
        assert_eq!(units.to_date(-9.969209968386869e36), None);
        assert_eq!(units.to_date(f64::NAN), None);
        assert_eq!(units.to_date(f64::INFINITY), None);
        // Within chrono's range but beyond the last representable date.
        assert_eq!(units.to_date(1.0e12), None);
    }
}
