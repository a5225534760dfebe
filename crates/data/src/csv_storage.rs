use std::fs::{self, File};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};
use rust_decimal::Decimal;

use crate::error::DataError;
use crate::models::{OutputRecord, RawObservation};

/// Columns a raw derivative-ticker file must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "timestamp",
    "funding_rate",
    "mark_price",
    "index_price",
    "funding_timestamp",
];

struct ColumnIndices {
    timestamp: usize,
    funding_rate: usize,
    mark_price: usize,
    index_price: usize,
    funding_timestamp: usize,
}

impl ColumnIndices {
    fn from_headers(path: &Path, headers: &StringRecord) -> Result<Self, DataError> {
        let lookup = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|&name| lookup(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(DataError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            });
        }

        let index = |name: &str| lookup(name).unwrap_or_default();
        Ok(Self {
            timestamp: index("timestamp"),
            funding_rate: index("funding_rate"),
            mark_price: index("mark_price"),
            index_price: index("index_price"),
            funding_timestamp: index("funding_timestamp"),
        })
    }
}

pub struct CsvStorage;

impl CsvStorage {
    /// Reads every row of a decompressed derivative-ticker CSV.
    ///
    /// Extra columns are ignored and column order is free. Blank numeric
    /// cells become `None`; the `timestamp` cell is mandatory.
    ///
    /// # Errors
    /// Returns [`DataError::MissingColumns`] naming every absent required
    /// column, or [`DataError::InvalidValue`] for unparseable cells.
    pub fn read_raw_observations(path: &Path) -> Result<Vec<RawObservation>, DataError> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let cols = ColumnIndices::from_headers(path, &headers)?;

        let mut observations = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let n = i as u64 + 1;
            let cell = |idx: usize| record.get(idx).unwrap_or_default();

            let timestamp_us = parse_micros(path, n, "timestamp", cell(cols.timestamp))?
                .ok_or_else(|| DataError::invalid_value(path, n, "timestamp", ""))?;

            observations.push(RawObservation {
                timestamp_us,
                funding_rate: parse_float(path, n, "funding_rate", cell(cols.funding_rate))?,
                mark_price: parse_float(path, n, "mark_price", cell(cols.mark_price))?,
                index_price: parse_float(path, n, "index_price", cell(cols.index_price))?,
                funding_timestamp_us: parse_micros(
                    path,
                    n,
                    "funding_timestamp",
                    cell(cols.funding_timestamp),
                )?,
            });
        }

        Ok(observations)
    }

    /// Writes output rows with header, creating parent directories.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails.
    pub fn write_output_records(path: &Path, records: &[OutputRecord]) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(OutputRecord::HEADER)?;
        for record in records {
            writer.write_record(record.to_row())?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads an output file back.
    ///
    /// # Errors
    /// Returns error on unreadable files or malformed rows.
    pub fn read_output_records(path: &Path) -> Result<Vec<OutputRecord>, DataError> {
        let mut reader = ReaderBuilder::new().from_path(path)?;
        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let n = i as u64 + 1;
            let cell = |idx: usize| row.get(idx).unwrap_or_default();
            let int = |idx: usize, column: &'static str| {
                cell(idx)
                    .parse::<i64>()
                    .map_err(|_| DataError::invalid_value(path, n, column, cell(idx)))
            };
            let dec = |idx: usize, column: &'static str| {
                cell(idx)
                    .parse::<Decimal>()
                    .map_err(|_| DataError::invalid_value(path, n, column, cell(idx)))
            };
            records.push(OutputRecord {
                timestamp_ms: int(0, "timestamp")?,
                mark_price: dec(1, "mark_price")?,
                index_price: dec(2, "index_price")?,
                last_funding_rate: dec(3, "last_funding_rate")?,
                next_funding_time_ms: int(4, "next_funding_time")?,
            });
        }
        Ok(records)
    }
}

fn parse_float(
    path: &Path,
    record: u64,
    column: &'static str,
    value: &str,
) -> Result<Option<f64>, DataError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::invalid_value(path, record, column, value))
}

/// Integer microseconds; float-formatted cells such as `1.7e15` are accepted
/// and truncated.
fn parse_micros(
    path: &Path,
    record: u64,
    column: &'static str,
    value: &str,
) -> Result<Option<i64>, DataError> {
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = value.parse::<i64>() {
        return Ok(Some(v));
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v as i64)),
        _ => Err(DataError::invalid_value(path, record, column, value)),
    }
}
