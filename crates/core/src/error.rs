//! Error types shared across the ETL crates.
//!
//! Only [`ConfigError`] and [`FetchError`] are ever fatal: a configuration
//! error aborts the run before any day is processed, a fetch error aborts a
//! single day. Everything else is reported per symbol inside a day report.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Start date is after end date.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },

    /// Availability matrix is missing or cannot be parsed.
    #[error("availability matrix {path}: {reason}")]
    Matrix {
        /// Matrix file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Configuration sources could not be merged or extracted.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl ConfigError {
    /// Creates a matrix error.
    pub fn matrix(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Matrix {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// The fetch collaborator failed as a whole.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials were rejected by the vendor.
    #[error("vendor rejected credentials (HTTP {status_code})")]
    Unauthorized {
        /// HTTP status code.
        status_code: u16,
    },

    /// Network or client failure.
    #[error("network error: {0}")]
    Network(String),

    /// Local filesystem failure while storing fetched files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure reported by the fetcher.
    #[error("fetch failed: {0}")]
    Other(String),
}

/// Errors that end a unit of work or the whole run.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Fatal before any day is processed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal for one day.
    #[error("fetch failed for {day}: {source}")]
    Fetch {
        /// The day being processed.
        day: NaiveDate,
        /// Underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// Filesystem failure outside any per-symbol stage.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// Wraps a fetch failure for `day`.
    pub fn fetch(day: NaiveDate, source: FetchError) -> Self {
        Self::Fetch { day, source }
    }

    /// Returns true if the whole run must stop.
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;
