//! Hourly resampling of tick-level funding-rate observations.
//!
//! Observations are bucketed by the UTC hour they fall in, never by their
//! position in the input, so unsorted files resample the same as sorted
//! ones. Each field is resolved independently:
//!
//! 1. within an hour the chronologically last value wins (equal timestamps:
//!    the later input row wins),
//! 2. empty hours take the nearest earlier value (forward fill),
//! 3. hours before the first value take the nearest later one (back fill).
//!
//! The fill always runs over the full 24-hour skeleton of the day.

use chrono::NaiveDate;
use thiserror::Error;

use market_etl_core::time_grid::{hour_of_day, hour_start_millis, HOURS_PER_DAY};

use crate::error::DataError;
use crate::models::{HourlySlot, OutputRecord, RawObservation};

/// A symbol-day that cannot produce an output file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompleteDataError {
    /// No observation falls inside the day.
    #[error("no observations on {day}")]
    NoObservations {
        /// The day being resampled.
        day: NaiveDate,
    },

    /// A field is blank in every observation of the day.
    #[error("field {field} has no value on {day}")]
    FieldNeverObserved {
        /// The day being resampled.
        day: NaiveDate,
        /// Column name.
        field: &'static str,
    },
}

/// A complete 24-slot day.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledDay {
    pub day: NaiveDate,
    pub slots: Vec<HourlySlot>,
    /// Observations that fell inside the day.
    pub observations: usize,
}

impl ResampledDay {
    /// Hours that had at least one observation.
    #[must_use]
    pub fn observed_hours(&self) -> usize {
        self.slots.iter().filter(|s| s.observed).count()
    }

    /// Hours whose values were filled from a neighbour.
    #[must_use]
    pub fn filled_hours(&self) -> usize {
        HOURS_PER_DAY - self.observed_hours()
    }

    /// True when every hour had its own observation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.filled_hours() == 0
    }

    /// Converts the slots into rounded output rows.
    ///
    /// # Errors
    /// Returns [`DataError::Unrepresentable`] for a value with no decimal form.
    pub fn to_output_records(&self) -> Result<Vec<OutputRecord>, DataError> {
        self.slots.iter().map(OutputRecord::from_slot).collect()
    }
}

/// Latest value seen so far for one field of one hour.
#[derive(Debug, Clone, Copy)]
struct Latest<T> {
    timestamp_us: i64,
    value: T,
}

fn keep_latest<T: Copy>(cell: &mut Option<Latest<T>>, timestamp_us: i64, value: Option<T>) {
    let Some(value) = value else {
        return;
    };
    // `>=` lets the later input row win a timestamp tie.
    if cell.map_or(true, |current| timestamp_us >= current.timestamp_us) {
        *cell = Some(Latest {
            timestamp_us,
            value,
        });
    }
}

/// Forward fills, then back fills the leading gap. Returns `None` when the
/// column has no value at all.
fn fill_column<T: Copy>(cells: &[Option<Latest<T>>; HOURS_PER_DAY]) -> Option<[T; HOURS_PER_DAY]> {
    let first = cells.iter().flatten().next()?.value;
    let mut filled = [first; HOURS_PER_DAY];
    let mut carry = first;
    for (slot, cell) in filled.iter_mut().zip(cells.iter()) {
        if let Some(latest) = cell {
            carry = latest.value;
        }
        *slot = carry;
    }
    Some(filled)
}

#[derive(Default)]
struct HourBuckets {
    funding_rate: [Option<Latest<f64>>; HOURS_PER_DAY],
    mark_price: [Option<Latest<f64>>; HOURS_PER_DAY],
    index_price: [Option<Latest<f64>>; HOURS_PER_DAY],
    funding_timestamp: [Option<Latest<i64>>; HOURS_PER_DAY],
    observed: [bool; HOURS_PER_DAY],
}

/// Resamples one symbol-day to exactly 24 hourly slots.
///
/// Observations outside `[day 00:00, day+1 00:00)` UTC are ignored.
///
/// # Errors
/// Returns [`IncompleteDataError`] when the day has no observations or a
/// field is never populated.
pub fn resample_hourly(
    day: NaiveDate,
    observations: &[RawObservation],
) -> Result<ResampledDay, IncompleteDataError> {
    let mut buckets = HourBuckets::default();
    let mut in_day = 0usize;

    for obs in observations {
        let Some(hour) = hour_of_day(day, obs.timestamp_us) else {
            continue;
        };
        in_day += 1;
        buckets.observed[hour] = true;
        let ts = obs.timestamp_us;
        keep_latest(&mut buckets.funding_rate[hour], ts, obs.funding_rate);
        keep_latest(&mut buckets.mark_price[hour], ts, obs.mark_price);
        keep_latest(&mut buckets.index_price[hour], ts, obs.index_price);
        keep_latest(&mut buckets.funding_timestamp[hour], ts, obs.funding_timestamp_us);
    }

    if in_day == 0 {
        return Err(IncompleteDataError::NoObservations { day });
    }

    let never = |field| IncompleteDataError::FieldNeverObserved { day, field };
    let funding_rate = fill_column(&buckets.funding_rate).ok_or_else(|| never("funding_rate"))?;
    let mark_price = fill_column(&buckets.mark_price).ok_or_else(|| never("mark_price"))?;
    let index_price = fill_column(&buckets.index_price).ok_or_else(|| never("index_price"))?;
    let funding_timestamp =
        fill_column(&buckets.funding_timestamp).ok_or_else(|| never("funding_timestamp"))?;

    let slots = (0..HOURS_PER_DAY)
        .map(|hour| HourlySlot {
            hour,
            start_ms: hour_start_millis(day, hour),
            funding_rate: funding_rate[hour],
            mark_price: mark_price[hour],
            index_price: index_price[hour],
            funding_timestamp_us: funding_timestamp[hour],
            observed: buckets.observed[hour],
        })
        .collect();

    Ok(ResampledDay {
        day,
        slots,
        observations: in_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_etl_core::time_grid::{day_start_micros, MICROS_PER_HOUR};

    const MINUTE: i64 = 60_000_000;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn at(hour: i64, minute: i64) -> i64 {
        day_start_micros(day()) + hour * MICROS_PER_HOUR + minute * MINUTE
    }

    fn obs(hour: i64, minute: i64, rate: f64) -> RawObservation {
        RawObservation::new(at(hour, minute), rate, 100.0 + rate, 99.0 + rate, at(16, 0))
    }

    #[test]
    fn test_empty_input_is_incomplete() {
        assert_eq!(
            resample_hourly(day(), &[]),
            Err(IncompleteDataError::NoObservations { day: day() })
        );
    }

    #[test]
    fn test_observations_outside_day_ignored() {
        let outside = [obs(-1, 30, 0.1), obs(24, 0, 0.2)];
        assert_eq!(
            resample_hourly(day(), &outside),
            Err(IncompleteDataError::NoObservations { day: day() })
        );
    }

    #[test]
    fn test_single_observation_fills_every_hour() {
        let result = resample_hourly(day(), &[obs(5, 0, 0.0003)]).unwrap();
        assert_eq!(result.slots.len(), 24);
        assert!(result.slots.iter().all(|s| s.funding_rate == 0.0003));
        assert_eq!(result.observed_hours(), 1);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_slots_are_contiguous_hours() {
        let result = resample_hourly(day(), &[obs(0, 0, 0.1)]).unwrap();
        for (i, slot) in result.slots.iter().enumerate() {
            assert_eq!(slot.hour, i);
            assert_eq!(slot.start_ms, 1_748_736_000_000 + i as i64 * 3_600_000);
        }
    }

    #[test]
    fn test_last_wins_within_hour_regardless_of_input_order() {
        // later tick listed first
        let input = [obs(9, 47, 0.0002), obs(9, 13, 0.0001)];
        let result = resample_hourly(day(), &input).unwrap();
        assert_eq!(result.slots[9].funding_rate, 0.0002);
    }

    #[test]
    fn test_timestamp_tie_later_row_wins() {
        let input = [obs(3, 10, 0.5), obs(3, 10, 0.7)];
        let result = resample_hourly(day(), &input).unwrap();
        assert_eq!(result.slots[3].funding_rate, 0.7);
    }

    #[test]
    fn test_fill_direction() {
        let input = [
            obs(10, 5, 0.10),
            obs(11, 5, 0.11),
            obs(12, 5, 0.12),
            obs(13, 5, 0.13),
            obs(14, 5, 0.14),
        ];
        let result = resample_hourly(day(), &input).unwrap();
        for hour in 0..10 {
            assert_eq!(result.slots[hour].funding_rate, 0.10, "hour {hour}");
        }
        for hour in 14..24 {
            assert_eq!(result.slots[hour].funding_rate, 0.14, "hour {hour}");
        }
        assert_eq!(result.slots[12].funding_rate, 0.12);
        assert_eq!(result.observed_hours(), 5);
    }

    #[test]
    fn test_interior_gap_forward_filled() {
        let input = [obs(2, 0, 0.2), obs(8, 0, 0.8)];
        let result = resample_hourly(day(), &input).unwrap();
        for hour in 2..8 {
            assert_eq!(result.slots[hour].funding_rate, 0.2);
        }
        assert_eq!(result.slots[8].funding_rate, 0.8);
    }

    #[test]
    fn test_fields_fill_independently() {
        let mut early = obs(1, 0, 0.01);
        early.mark_price = None;
        let mut late = obs(6, 0, 0.06);
        late.funding_rate = None;
        late.mark_price = Some(250.0);

        let result = resample_hourly(day(), &[early, late]).unwrap();
        // funding_rate only known at hour 1
        assert!(result.slots.iter().all(|s| s.funding_rate == 0.01));
        // mark_price only known at hour 6, back filled before it
        assert!(result.slots.iter().all(|s| s.mark_price == 250.0));
    }

    #[test]
    fn test_blank_value_does_not_override_earlier_value_in_hour() {
        let mut later = obs(4, 50, 0.9);
        later.funding_rate = None;
        let result = resample_hourly(day(), &[obs(4, 10, 0.4), later]).unwrap();
        assert_eq!(result.slots[4].funding_rate, 0.4);
        assert_eq!(result.slots[4].mark_price, 100.9);
    }

    #[test]
    fn test_field_never_observed() {
        let mut only = obs(4, 0, 0.4);
        only.index_price = None;
        assert_eq!(
            resample_hourly(day(), &[only]),
            Err(IncompleteDataError::FieldNeverObserved {
                day: day(),
                field: "index_price"
            })
        );
    }

    #[test]
    fn test_full_day_is_complete() {
        let input: Vec<_> = (0..24).map(|h| obs(h, 59, h as f64)).collect();
        let result = resample_hourly(day(), &input).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.observations, 24);
        assert_eq!(result.slots[23].funding_rate, 23.0);
    }

    #[test]
    fn test_single_populated_hour_scenario() {
        let input = [obs(9, 13, 0.0001), obs(9, 47, 0.0002)];
        let records = resample_hourly(day(), &input)
            .unwrap()
            .to_output_records()
            .unwrap();
        assert_eq!(records.len(), 24);
        assert!(records
            .iter()
            .all(|r| r.last_funding_rate == rust_decimal::Decimal::new(2, 4)));
        assert_eq!(records[0].timestamp_ms, 1_748_736_000_000);
    }
}
