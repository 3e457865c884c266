//! Timestamp normalization and inclusive date windows.
//!
//! The issue tracker renders offsets without a colon (`+0000`), which RFC 3339
//! parsers reject. Everything that reads an upstream timestamp goes through
//! [`parse_timestamp`].

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::types::ValidationError;

/// Trailing numeric offset without a colon separator, e.g. `+0530`.
static COMPACT_OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])(\d{2})(\d{2})$").unwrap());

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rewrites a trailing `+HHMM` / `-HHMM` offset to `+HH:MM`.
///
/// Inputs that already carry a colon offset (or `Z`) are returned unchanged.
pub fn normalize_offset(raw: &str) -> Cow<'_, str> {
    COMPACT_OFFSET_RE.replace(raw, "$1$2:$3")
}

/// Parses an upstream timestamp into UTC, normalizing the offset first.
///
/// Returns `None` for anything that is still not RFC 3339 after normalization;
/// callers treat such records as skippable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_offset(raw.trim());
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// An inclusive `[start 00:00:00.000, end 23:59:59.999]` window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start_date: NaiveDate,
    end_date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// Widens two calendar dates to full-day UTC bounds.
    ///
    /// An end date before the start date is allowed; such a window simply
    /// contains nothing.
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let start = start_date.and_time(NaiveTime::MIN).and_utc();
        let end = end_date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1) - Duration::milliseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            start_date,
            end_date,
            start,
            end,
        }
    }

    /// Parses `YYYY-MM-DD` request dates. Both are required.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        let start_date = parse_date("start date", start)?;
        let end_date = parse_date("end date", end)?;
        Ok(Self::from_dates(start_date, end_date))
    }

    /// Returns true if `at` lies within the window, bounds included.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

fn parse_date(field: &'static str, value: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingDate { field })?;
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
