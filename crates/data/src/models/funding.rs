//! Funding-rate data models.
//!
//! Raw vendor ticks come in as [`RawObservation`], are resampled into
//! [`HourlySlot`]s and leave as [`OutputRecord`] rows, which is the only
//! place values are rounded.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::DataError;

/// Decimal digits kept for prices and rates in output files.
pub const OUTPUT_DECIMALS: u32 = 8;

/// One tick-level derivative ticker record.
///
/// Numeric cells may be blank in vendor files; a blank cell is `None` for
/// that field only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    /// Exchange timestamp, microseconds since epoch.
    pub timestamp_us: i64,
    pub funding_rate: Option<f64>,
    pub mark_price: Option<f64>,
    pub index_price: Option<f64>,
    /// Next funding event, microseconds since epoch.
    pub funding_timestamp_us: Option<i64>,
}

impl RawObservation {
    /// Creates an observation with every field present.
    #[must_use]
    pub fn new(
        timestamp_us: i64,
        funding_rate: f64,
        mark_price: f64,
        index_price: f64,
        funding_timestamp_us: i64,
    ) -> Self {
        Self {
            timestamp_us,
            funding_rate: Some(funding_rate),
            mark_price: Some(mark_price),
            index_price: Some(index_price),
            funding_timestamp_us: Some(funding_timestamp_us),
        }
    }
}

/// One resampled hour of a symbol-day, every field filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlySlot {
    /// Hour of day, 0..24.
    pub hour: usize,
    /// Hour start, milliseconds since epoch.
    pub start_ms: i64,
    pub funding_rate: f64,
    pub mark_price: f64,
    pub index_price: f64,
    pub funding_timestamp_us: i64,
    /// True if at least one raw observation fell in this hour.
    pub observed: bool,
}

/// One row of an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Hour start, milliseconds since epoch.
    pub timestamp_ms: i64,
    pub mark_price: Decimal,
    pub index_price: Decimal,
    pub last_funding_rate: Decimal,
    /// Next funding event, milliseconds since epoch.
    pub next_funding_time_ms: i64,
}

impl OutputRecord {
    /// Column order of output files.
    pub const HEADER: [&'static str; 5] = [
        "timestamp",
        "mark_price",
        "index_price",
        "last_funding_rate",
        "next_funding_time",
    ];

    /// Builds an output row, rounding the numeric fields.
    ///
    /// # Errors
    /// Returns [`DataError::Unrepresentable`] for NaN or out-of-range values.
    pub fn from_slot(slot: &HourlySlot) -> Result<Self, DataError> {
        Ok(Self {
            timestamp_ms: slot.start_ms,
            mark_price: round_output(slot.mark_price)?,
            index_price: round_output(slot.index_price)?,
            last_funding_rate: round_output(slot.funding_rate)?,
            next_funding_time_ms: market_etl_core::time_grid::micros_to_millis(
                slot.funding_timestamp_us,
            ),
        })
    }

    /// Row cells in [`Self::HEADER`] order.
    #[must_use]
    pub fn to_row(&self) -> [String; 5] {
        [
            self.timestamp_ms.to_string(),
            self.mark_price.to_string(),
            self.index_price.to_string(),
            self.last_funding_rate.to_string(),
            self.next_funding_time_ms.to_string(),
        ]
    }
}

/// Rounds a float to [`OUTPUT_DECIMALS`] places, ties to even.
///
/// # Errors
/// Returns [`DataError::Unrepresentable`] if the value has no decimal form.
pub fn round_output(value: f64) -> Result<Decimal, DataError> {
    let decimal = Decimal::from_f64(value).ok_or(DataError::Unrepresentable(value))?;
    Ok(round_decimal(decimal))
}

/// Rounds a decimal to [`OUTPUT_DECIMALS`] places, ties to even, trailing
/// zeros stripped.
#[must_use]
pub fn round_decimal(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(OUTPUT_DECIMALS, RoundingStrategy::MidpointNearestEven)
        .normalize()
}
