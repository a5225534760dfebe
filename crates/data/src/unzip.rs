//! Extraction of daily aggTrades zip archives into a CSV tree.
//!
//! ```text
//! {zip_root}/data/futures/um/daily/aggTrades/{symbol}/{symbol}-aggTrades-{day}.zip
//!   -> {dest_root}/data/futures/um/daily/aggTrades/{symbol}/{symbol}-aggTrades-{day}.csv
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use market_etl_core::time_grid::days_inclusive;

use crate::error::DataError;
use crate::layout::{agg_trades_dir, agg_trades_stem, agg_trades_zip_path};

/// Extracts every entry of the zip at `src` into `dest_dir` and returns the
/// number of entries.
///
/// # Errors
/// Returns [`DataError::Io`] if `src` cannot be opened and [`DataError::Zip`]
/// if it is not a readable zip archive.
pub fn unzip_file(src: &Path, dest_dir: &Path) -> Result<usize, DataError> {
    let mut archive = zip::ZipArchive::new(File::open(src)?)?;
    fs::create_dir_all(dest_dir)?;
    archive.extract(dest_dir)?;
    Ok(archive.len())
}

/// A zip that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnzipWarning {
    #[error("not downloaded: {}", path.display())]
    Missing { path: PathBuf },

    #[error("{}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnzipStats {
    pub extracted: usize,
    /// CSV already present in the destination.
    pub skipped: usize,
    pub entries: usize,
    pub warnings: Vec<UnzipWarning>,
}

impl UnzipStats {
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Unzipped {} archives ({} entries), {} already extracted, {} missing or corrupt",
            self.extracted,
            self.entries,
            self.skipped,
            self.warnings.len()
        )
    }
}

/// Unzips each symbol's daily archives for `[start, end]`.
///
/// Missing and corrupt archives are recorded as warnings and never stop the
/// walk. Days whose CSV already exists in `dest_root` are skipped.
pub fn unzip_agg_trades(
    zip_root: &Path,
    dest_root: &Path,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> UnzipStats {
    let mut stats = UnzipStats::default();

    for symbol in symbols {
        let dest_dir = agg_trades_dir(dest_root, symbol);
        for day in days_inclusive(start, end) {
            if dest_dir
                .join(format!("{}.csv", agg_trades_stem(symbol, day)))
                .is_file()
            {
                stats.skipped += 1;
                continue;
            }

            let src = agg_trades_zip_path(zip_root, symbol, day);
            if !src.is_file() {
                debug!(%symbol, %day, "No archive to unzip");
                stats.warnings.push(UnzipWarning::Missing { path: src });
                continue;
            }

            match unzip_file(&src, &dest_dir) {
                Ok(entries) => {
                    stats.extracted += 1;
                    stats.entries += entries;
                }
                Err(e) => {
                    warn!(path = %src.display(), "Unzip failed: {e}");
                    stats.warnings.push(UnzipWarning::Corrupt {
                        path: src,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    stats
}
