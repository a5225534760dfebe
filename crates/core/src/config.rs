use crate::error::ConfigError;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Explicit run configuration. The pipeline never prompts; every value is
/// decided before the first day runs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub run: RunConfig,
    pub storage: StorageConfig,
    pub tardis: TardisConfig,
    pub concurrency: ConcurrencyConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Process only `start_date`.
    pub test_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_path: PathBuf,
    pub matrix_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TardisConfig {
    pub base_url: String,
    pub exchange: String,
    pub data_type: String,
    /// Vendor credential; an empty string means anonymous access.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Parallel downloads inside one fetch call.
    pub fetch_concurrency: usize,
    /// Blocking workers used by the convert stage.
    pub convert_workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub task_timeout_secs: u64,
    pub download_root: PathBuf,
    /// Destination of unzipped aggTrades CSVs.
    pub extract_root: PathBuf,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 22).unwrap_or_default(),
            test_mode: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/mnt/ssd1/funding_rate_data"),
            matrix_path: PathBuf::from("res/availability_matrix.csv"),
        }
    }
}

impl Default for TardisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datasets.tardis.dev".to_string(),
            exchange: "binance-futures".to_string(),
            data_type: "derivative_ticker".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            fetch_concurrency: 5,
            convert_workers: cpus.min(8),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            max_retries: 3,
            retry_backoff_secs: 2,
            task_timeout_secs: 300,
            download_root: PathBuf::from("/opt/binance_public_data_zip"),
            extract_root: PathBuf::from("/opt/binance_public_data"),
        }
    }
}

impl EtlConfig {
    /// Checks the configuration before anything runs.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an inverted date range or zero-sized pools.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.start_date > self.run.end_date && !self.run.test_mode {
            return Err(ConfigError::InvalidDateRange {
                start: self.run.start_date,
                end: self.run.end_date,
            });
        }
        if self.concurrency.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency.convert_workers == 0 {
            return Err(ConfigError::Invalid(
                "convert_workers must be at least 1".to_string(),
            ));
        }
        if self.batch.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "batch max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Days the run covers: only the start day in test mode.
    #[must_use]
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        if self.run.test_mode {
            (self.run.start_date, self.run.start_date)
        } else {
            (self.run.start_date, self.run.end_date)
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.storage.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(EtlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_start_after_end_rejected() {
        let mut config = EtlConfig::default();
        config.run.start_date = day(2025, 6, 2);
        config.run.end_date = day(2025, 6, 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_test_mode_covers_single_day() {
        let mut config = EtlConfig::default();
        config.run.start_date = day(2025, 5, 1);
        config.run.end_date = day(2025, 6, 22);
        config.run.test_mode = true;
        assert_eq!(config.date_range(), (day(2025, 5, 1), day(2025, 5, 1)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = EtlConfig::default();
        config.concurrency.convert_workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_defaults_match_vendor() {
        let config = TardisConfig::default();
        assert_eq!(config.exchange, "binance-futures");
        assert_eq!(config.data_type, "derivative_ticker");
        assert!(config.api_key.is_none());
    }
}
