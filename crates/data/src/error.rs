//! Error types for reading, writing and packaging day files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from file-level data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding/encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Zip archive unreadable or corrupt.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Input file lacks required columns.
    #[error("{path}: missing columns {missing:?}")]
    MissingColumns {
        /// File that failed validation.
        path: PathBuf,
        /// Every required column that was absent.
        missing: Vec<&'static str>,
    },

    /// A cell could not be parsed.
    #[error("{path}: record {record}: invalid {column} value '{value}'")]
    InvalidValue {
        /// File being read.
        path: PathBuf,
        /// 1-based data record number.
        record: u64,
        /// Column name.
        column: &'static str,
        /// Raw cell content.
        value: String,
    },

    /// A float cannot be represented as a decimal (NaN, infinite, out of range).
    #[error("value {0} cannot be written as a decimal")]
    Unrepresentable(f64),
}

impl DataError {
    /// Creates an invalid value error.
    pub fn invalid_value(
        path: impl Into<PathBuf>,
        record: u64,
        column: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            path: path.into(),
            record,
            column,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_all() {
        let err = DataError::MissingColumns {
            path: PathBuf::from("BTCUSDT/funding_rate/2025-05-01.csv"),
            missing: vec!["mark_price", "funding_timestamp"],
        };
        let display = err.to_string();
        assert!(display.contains("2025-05-01.csv"));
        assert!(display.contains("mark_price"));
        assert!(display.contains("funding_timestamp"));
    }

    #[test]
    fn test_invalid_value_display() {
        let err = DataError::invalid_value("x.csv", 7, "funding_rate", "abc");
        assert!(err.to_string().contains("record 7"));
        assert!(err.to_string().contains("'abc'"));
    }
}
