//! Month parsing and calendar-range helpers.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};

/// Inclusive datetime range covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthRange {
    /// Parse a `YYYY-MM` string into the range
    /// `[first-day 00:00:00, last-day 23:59:59]`, honoring true month
    /// lengths (28-31 days, leap years).
    pub fn parse(month: &str) -> Option<Self> {
        let mut parts = month.trim().splitn(3, '-');
        let year: i32 = parts.next()?.parse().ok()?;
        let mon: u32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let first = NaiveDate::from_ymd_opt(year, mon, 1)?;
        let next_month = if mon == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, mon + 1, 1)?
        };
        let last = next_month.pred_opt()?;

        Some(Self {
            start: first.and_hms_opt(0, 0, 0)?,
            end: last.and_hms_opt(23, 59, 59)?,
        })
    }

    /// Whether a calendar date falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start.date() && date <= self.end.date()
    }
}

/// Current month in `YYYY-MM` form (UTC).
pub fn current_month() -> String {
    let now = Utc::now();
    format!("{:04}-{:02}", now.year(), now.month())
}
