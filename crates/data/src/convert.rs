//! Raw derivative-ticker CSV → hourly output CSV.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use market_etl_core::time_grid::parse_day;

use crate::csv_storage::CsvStorage;
use crate::error::DataError;
use crate::layout::{output_file_name, DATA_TYPE_DIR};
use crate::resampler::{resample_hourly, IncompleteDataError};

/// Why one file produced no output.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Incomplete(#[from] IncompleteDataError),
}

/// Result of converting one symbol-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedFile {
    /// Observations that fell inside the day.
    pub observations: usize,
    /// Hours with their own observation, out of 24.
    pub observed_hours: usize,
}

impl ConvertedFile {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.observed_hours == market_etl_core::HOURS_PER_DAY
    }
}

/// Reads `src`, resamples it to 24 hourly rows for `day` and writes `dest`.
///
/// Nothing is written when the day has no usable observations.
///
/// # Errors
/// Returns [`ConvertError::Data`] for unreadable or malformed input and
/// [`ConvertError::Incomplete`] when the day cannot be resampled.
pub fn convert_file(src: &Path, dest: &Path, day: NaiveDate) -> Result<ConvertedFile, ConvertError> {
    let observations = CsvStorage::read_raw_observations(src)?;
    let resampled = resample_hourly(day, &observations)?;
    let records = resampled.to_output_records()?;
    CsvStorage::write_output_records(dest, &records)?;

    Ok(ConvertedFile {
        observations: resampled.observations,
        observed_hours: resampled.observed_hours(),
    })
}

/// Counters for a whole-tree conversion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertTreeStats {
    pub converted: usize,
    pub partial: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ConvertTreeStats {
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Converted {} files ({} with filled hours), skipped {}, failed {}",
            self.converted, self.partial, self.skipped, self.failed
        )
    }
}

/// Converts every `{symbol}/funding_rate/{day}.csv` below `extract_root`
/// into `{output_root}/{symbol}/{settlement_ms}.csv`.
///
/// Files whose stem is not a date are ignored.
///
/// # Errors
/// Returns [`DataError::Io`] only if `extract_root` itself cannot be listed.
pub fn convert_tree(extract_root: &Path, output_root: &Path) -> Result<ConvertTreeStats, DataError> {
    let mut stats = ConvertTreeStats::default();

    for (symbol, day, src) in day_files(extract_root)? {
        let dest = output_root.join(&symbol).join(output_file_name(day));
        match convert_file(&src, &dest, day) {
            Ok(file) => {
                stats.converted += 1;
                if !file.is_complete() {
                    stats.partial += 1;
                    warn!(%symbol, %day, observed_hours = file.observed_hours, "Filled missing hours");
                }
            }
            Err(ConvertError::Incomplete(e)) => {
                stats.skipped += 1;
                warn!(%symbol, %day, "Skipped: {e}");
            }
            Err(ConvertError::Data(e)) => {
                stats.failed += 1;
                warn!(%symbol, %day, "Conversion failed: {e}");
            }
        }
    }

    Ok(stats)
}

fn day_files(extract_root: &Path) -> Result<Vec<(String, NaiveDate, PathBuf)>, DataError> {
    let mut files = Vec::new();
    for symbol_dir in fs::read_dir(extract_root)? {
        let symbol_dir = symbol_dir?;
        let data_dir = symbol_dir.path().join(DATA_TYPE_DIR);
        if !data_dir.is_dir() {
            continue;
        }
        let symbol = symbol_dir.file_name().to_string_lossy().into_owned();
        for entry in fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(day) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| parse_day(s).ok())
            else {
                debug!(path = %path.display(), "Ignoring non-day file");
                continue;
            };
            files.push((symbol.clone(), day, path));
        }
    }
    files.sort();
    Ok(files)
}
