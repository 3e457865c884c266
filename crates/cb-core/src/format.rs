//! Duration formatting and unit conversion shared by every report.
//!
//! These conventions are consumed by spreadsheets and dashboards that compare
//! values across reports, so they are kept exact.

const MS_PER_MINUTE: i64 = 60_000;
const MINUTES_PER_DAY: i64 = 60 * 24;
const SECONDS_PER_HOUR: f64 = 3600.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
/// Hours in one reported work day.
pub const WORKDAY_HOURS: f64 = 8.0;

/// Formats milliseconds as `"{d}d {h}h {m}m"`.
///
/// Zero-valued day and hour components are omitted. Minutes are shown when
/// non-zero or when they are the only component, so zero renders as `"0m"`.
/// Negative durations are treated as zero and seconds are floored.
pub fn format_duration(ms: i64) -> String {
    let total_minutes = ms.max(0) / MS_PER_MINUTE;
    let days = total_minutes / MINUTES_PER_DAY;
    let hours = (total_minutes % MINUTES_PER_DAY) / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || (days == 0 && hours == 0) {
        parts.push(format!("{minutes}m"));
    }
    parts.join(" ")
}

/// Rounds to two decimals, halves away from zero.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts milliseconds to hours rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn ms_to_hours(ms: i64) -> f64 {
    round_hundredths(ms as f64 / MS_PER_HOUR)
}

/// Converts logged seconds to work days (8-hour days), rounded to two decimals.
///
/// `round(hours / 8 * 100) / 100`.
#[allow(clippy::cast_precision_loss)]
pub fn seconds_to_days(seconds: u64) -> f64 {
    let hours = seconds as f64 / SECONDS_PER_HOUR;
    round_hundredths(hours / WORKDAY_HOURS)
}
