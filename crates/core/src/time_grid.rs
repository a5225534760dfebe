//! UTC day arithmetic and timestamp unit conversions.
//!
//! Every file the pipeline produces for a day is keyed by the settlement
//! timestamp computed here. Convert, Archive and Purge all call
//! [`settlement_timestamp_millis`] so the key is bit-exact between the
//! producer and its consumers.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Microseconds in one hour.
pub const MICROS_PER_HOUR: i64 = 3_600_000_000;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Hourly slots in one UTC day.
pub const HOURS_PER_DAY: usize = 24;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` day string.
///
/// # Errors
/// Returns a chrono parse error if the string is not an ISO calendar date.
pub fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)
}

/// Formats a day as `YYYY-MM-DD`.
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Returns the half-open UTC interval `[day 00:00, day+1 00:00)`.
#[must_use]
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    (start, start + Duration::days(1))
}

/// Millisecond timestamp of `(day + 1) 00:00:00 UTC`.
///
/// Computed purely from the proleptic calendar (days since the epoch), so
/// the host timezone can never shift the result.
#[must_use]
pub fn settlement_timestamp_millis(day: NaiveDate) -> i64 {
    let days_since_epoch = i64::from(day.num_days_from_ce() - EPOCH_DAYS_FROM_CE);
    (days_since_epoch + 1) * MILLIS_PER_DAY
}

// 1970-01-01 counted from 0001-01-01 (day 1).
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Day start in microseconds since the epoch.
#[must_use]
pub fn day_start_micros(day: NaiveDate) -> i64 {
    millis_to_micros(settlement_timestamp_millis(day) - MILLIS_PER_DAY)
}

/// Truncating microsecond to millisecond conversion.
#[must_use]
pub const fn micros_to_millis(micros: i64) -> i64 {
    micros / 1000
}

/// Millisecond to microsecond conversion.
#[must_use]
pub const fn millis_to_micros(millis: i64) -> i64 {
    millis * 1000
}

/// Floors a microsecond timestamp to the start of its UTC hour.
#[must_use]
pub const fn hour_floor_micros(micros: i64) -> i64 {
    micros.div_euclid(MICROS_PER_HOUR) * MICROS_PER_HOUR
}

/// Hour of `day` (0..24) that contains `micros`, or `None` outside the day.
#[must_use]
pub fn hour_of_day(day: NaiveDate, micros: i64) -> Option<usize> {
    let offset = micros.checked_sub(day_start_micros(day))?;
    if offset < 0 {
        return None;
    }
    let hour = (offset / MICROS_PER_HOUR) as usize;
    (hour < HOURS_PER_DAY).then_some(hour)
}

/// Millisecond start of the given hour of `day`.
#[must_use]
pub fn hour_start_millis(day: NaiveDate, hour: usize) -> i64 {
    micros_to_millis(day_start_micros(day) + hour as i64 * MICROS_PER_HOUR)
}

/// Every day from `start` to `end`, both inclusive. Empty when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Splits `[start, end]` into calendar-month chunks, clipped to the range.
///
/// `2025-01-15..=2025-03-10` yields `(01-15, 01-31)`, `(02-01, 02-28)`,
/// `(03-01, 03-10)`.
#[must_use]
pub fn monthly_intervals(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut intervals = Vec::new();
    let mut current = start;

    while current <= end {
        let next_month = if current.month() == 12 {
            NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(current.year(), current.month() + 1, 1)
        };
        let Some(next_month) = next_month else {
            intervals.push((current, end));
            break;
        };
        let month_end = (next_month - Duration::days(1)).min(end);
        intervals.push((current, month_end));
        current = next_month;
    }

    intervals
}
