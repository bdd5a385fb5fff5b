//! # Periods
//!
//! Granularities, period truncation and report date range resolution.
//!
//! ## Week Convention
//! Weeks are ISO 8601: they start on Monday, and week 1 is the week that
//! contains the year's first Thursday. A year has 52 or 53 weeks, and the
//! first days of January can belong to the previous ISO year.
//!
//! ```text
//!   2020-12-28 (Mon) ─────────── 2021-01-03 (Sun)    2020-W53
//!   2021-01-04 (Mon) ─────────── 2021-01-10 (Sun)    2021-W01
//! ```
//!
//! ## Range Semantics
//! A [`DateRange`] is inclusive of both dates. Storage filters translate it
//! to a half-open instant range with [`DateRange::bounds_utc`]:
//!
//! ```text
//!   DateRange { 2024-07-22 ..= 2024-07-28 }
//!     └─► date >= 2024-07-22T00:00:00Z AND date < 2024-07-29T00:00:00Z
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_month;

// =============================================================================
// Granularity
// =============================================================================

/// Width of an aggregation bucket, also used as the report period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// Exact, lowercase names only.
    fn lookup(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == s)
    }

    /// Parses a report period type.
    ///
    /// Same vocabulary as [`FromStr`], but the failure is
    /// [`CoreError::InvalidPeriodType`].
    pub fn from_period_type(s: &str) -> CoreResult<Self> {
        Self::lookup(s).ok_or_else(|| CoreError::InvalidPeriodType(s.to_string()))
    }

    /// First day of the period that contains `date`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::period::Granularity;
    ///
    /// let d = NaiveDate::from_ymd_opt(2024, 7, 25).unwrap(); // Thursday
    /// assert_eq!(Granularity::Weekly.truncate(d), NaiveDate::from_ymd_opt(2024, 7, 22).unwrap());
    /// assert_eq!(Granularity::Monthly.truncate(d), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    /// ```
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Monthly => date - Duration::days(i64::from(date.day0())),
            Granularity::Yearly => date - Duration::days(i64::from(date.ordinal0())),
        }
    }

    /// Display label for the period starting at `start`.
    ///
    /// ```text
    /// Daily    2024-07-25
    /// Weekly   2024-W30     (ISO year and week)
    /// Monthly  2024-07
    /// Yearly   2024
    /// ```
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            Granularity::Daily => start.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => {
                let iso = start.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            Granularity::Monthly => start.format("%Y-%m").to_string(),
            Granularity::Yearly => start.year().to_string(),
        }
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| CoreError::InvalidGranularity(s.to_string()))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive range of calendar dates (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        DateRange::new(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Half-open instant bounds `[start 00:00, end + 1 day 00:00)` in UTC.
    pub fn bounds_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.start.and_time(NaiveTime::MIN).and_utc();
        let until = (self.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
        (from, until)
    }
}

// =============================================================================
// Period Resolution
// =============================================================================

/// Number of ISO weeks in `year` (52 or 53).
///
/// December 28th always falls in the last ISO week of its year.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

fn out_of_range(field: &str, min: i64, max: i64) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min,
        max,
    }
    .into()
}

fn ymd(year: i32, month: u32, day: u32) -> CoreResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        out_of_range(
            "year",
            i64::from(NaiveDate::MIN.year()),
            i64::from(NaiveDate::MAX.year()),
        )
    })
}

fn month_range(year: i32, month: u32) -> CoreResult<DateRange> {
    validate_month(month)?;
    let start = ymd(year, month, 1)?;
    let next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    Ok(DateRange::new(start, next - Duration::days(1)))
}

/// Resolves a report period to an inclusive date range.
///
/// ## Rules
/// ```text
/// ┌──────────┬──────────────────────────────┬──────────────────────────────┐
/// │ Period   │ Selector given               │ Selector absent              │
/// ├──────────┼──────────────────────────────┼──────────────────────────────┤
/// │ daily    │ n/a                          │ today ..= today              │
/// │ weekly   │ ISO `week` of `year`         │ Monday ..= Sunday of today   │
/// │          │ (default: today's ISO year)  │                              │
/// │ monthly  │ `month` of `year`            │ current calendar month       │
/// │          │ (default: current year)      │                              │
/// │ yearly   │ Jan 1 ..= Dec 31 of `year`   │ current year                 │
/// └──────────┴──────────────────────────────┴──────────────────────────────┘
/// ```
///
/// ## Errors
/// - week outside `1..=weeks_in_year(year)` → `Validation(OutOfRange)`
/// - month outside `1..=12` → `Validation(OutOfRange)`
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::period::{resolve_period, Granularity};
///
/// let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
/// let range = resolve_period(Granularity::Weekly, Some(2024), None, Some(30), today).unwrap();
/// assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 7, 22).unwrap());
/// assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 7, 28).unwrap());
/// ```
pub fn resolve_period(
    period: Granularity,
    year: Option<i32>,
    month: Option<u32>,
    week: Option<u32>,
    today: NaiveDate,
) -> CoreResult<DateRange> {
    match period {
        Granularity::Daily => Ok(DateRange::single_day(today)),

        Granularity::Weekly => match week {
            Some(week) => {
                let year = year.unwrap_or_else(|| today.iso_week().year());
                let max = weeks_in_year(year);
                if !(1..=max).contains(&week) {
                    return Err(out_of_range("week", 1, i64::from(max)));
                }
                let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
                    .ok_or_else(|| out_of_range("week", 1, i64::from(max)))?;
                Ok(DateRange::new(start, start + Duration::days(6)))
            }
            None => {
                let start = Granularity::Weekly.truncate(today);
                Ok(DateRange::new(start, start + Duration::days(6)))
            }
        },

        Granularity::Monthly => match month {
            Some(month) => month_range(year.unwrap_or_else(|| today.year()), month),
            None => month_range(today.year(), today.month()),
        },

        Granularity::Yearly => {
            let year = year.unwrap_or_else(|| today.year());
            Ok(DateRange::new(ymd(year, 1, 1)?, ymd(year, 12, 31)?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
