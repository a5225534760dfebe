//! Data models for the funding-rate pipeline.

pub mod funding;

pub use funding::{round_decimal, round_output, HourlySlot, OutputRecord, RawObservation, OUTPUT_DECIMALS};
