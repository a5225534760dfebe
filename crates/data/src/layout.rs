//! On-disk layout of a funding-rate run below one base path.
//!
//! ```text
//! {base}/download/{symbol}/funding_rate/{day}.csv.gz
//! {base}/extract/{symbol}/funding_rate/{day}.csv
//! {base}/output/{symbol}/{settlement_ms}.csv
//! {base}/final/funding_rate_{day}.tar.gz
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use market_etl_core::time_grid::{format_day, settlement_timestamp_millis};

/// Data-type directory below each symbol in the fetch and extract roots.
pub const DATA_TYPE_DIR: &str = "funding_rate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    base: PathBuf,
}

impl DataLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn download_root(&self) -> PathBuf {
        self.base.join("download")
    }

    pub fn extract_root(&self) -> PathBuf {
        self.base.join("extract")
    }

    pub fn output_root(&self) -> PathBuf {
        self.base.join("output")
    }

    pub fn final_root(&self) -> PathBuf {
        self.base.join("final")
    }

    /// Roots that hold per-symbol intermediates, in stage order.
    pub fn intermediate_roots(&self) -> [PathBuf; 3] {
        [self.download_root(), self.extract_root(), self.output_root()]
    }

    /// Creates all four roots.
    ///
    /// # Errors
    /// Returns the first directory creation failure.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for root in self.intermediate_roots() {
            fs::create_dir_all(root)?;
        }
        fs::create_dir_all(self.final_root())
    }

    pub fn fetched_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        fetched_file_path(&self.download_root(), symbol, day)
    }

    pub fn extracted_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        self.extract_root()
            .join(symbol)
            .join(DATA_TYPE_DIR)
            .join(format!("{}.csv", format_day(day)))
    }

    /// `output/{symbol}/{settlement_ms}.csv`, the name every stage agrees on.
    pub fn output_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        self.output_root().join(symbol).join(output_file_name(day))
    }

    pub fn archive_path(&self, day: NaiveDate) -> PathBuf {
        self.final_root()
            .join(format!("funding_rate_{}.tar.gz", format_day(day)))
    }
}

/// `{root}/{symbol}/funding_rate/{day}.csv.gz`.
pub fn fetched_file_path(root: &Path, symbol: &str, day: NaiveDate) -> PathBuf {
    root.join(symbol)
        .join(DATA_TYPE_DIR)
        .join(format!("{}.csv.gz", format_day(day)))
}

/// Public-bucket prefix of daily USD-M aggTrades archives.
pub const AGG_TRADES_PREFIX: &str = "data/futures/um/daily/aggTrades";

/// `{root}/data/futures/um/daily/aggTrades/{symbol}`.
pub fn agg_trades_dir(root: &Path, symbol: &str) -> PathBuf {
    root.join(AGG_TRADES_PREFIX).join(symbol)
}

/// `{symbol}-aggTrades-{day}` without extension.
pub fn agg_trades_stem(symbol: &str, day: NaiveDate) -> String {
    format!("{symbol}-aggTrades-{}", format_day(day))
}

/// `{root}/data/futures/um/daily/aggTrades/{symbol}/{symbol}-aggTrades-{day}.zip`.
pub fn agg_trades_zip_path(root: &Path, symbol: &str, day: NaiveDate) -> PathBuf {
    agg_trades_dir(root, symbol).join(format!("{}.zip", agg_trades_stem(symbol, day)))
}

/// `{settlement_ms}.csv` for `day`.
pub fn output_file_name(day: NaiveDate) -> String {
    format!("{}.csv", settlement_timestamp_millis(day))
}

/// Path of a symbol's output file inside a day archive.
pub fn archive_entry_name(symbol: &str, day: NaiveDate) -> String {
    format!("{symbol}/{}", output_file_name(day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.fetched_path("BTCUSDT", day()),
            PathBuf::from("/data/download/BTCUSDT/funding_rate/2025-06-01.csv.gz")
        );
        assert_eq!(
            layout.extracted_path("BTCUSDT", day()),
            PathBuf::from("/data/extract/BTCUSDT/funding_rate/2025-06-01.csv")
        );
        assert_eq!(
            layout.output_path("BTCUSDT", day()),
            PathBuf::from("/data/output/BTCUSDT/1748822400000.csv")
        );
        assert_eq!(
            layout.archive_path(day()),
            PathBuf::from("/data/final/funding_rate_2025-06-01.tar.gz")
        );
    }

    #[test]
    fn test_archive_entry_matches_output_name() {
        let layout = DataLayout::new("/data");
        let entry = archive_entry_name("ETHUSDT", day());
        assert_eq!(entry, "ETHUSDT/1748822400000.csv");
        assert!(layout
            .output_path("ETHUSDT", day())
            .ends_with(Path::new(&entry)));
    }

    #[test]
    fn test_agg_trades_paths() {
        assert_eq!(
            agg_trades_zip_path(Path::new("/zips"), "BTCUSDT", day()),
            PathBuf::from(
                "/zips/data/futures/um/daily/aggTrades/BTCUSDT/BTCUSDT-aggTrades-2025-06-01.zip"
            )
        );
        assert_eq!(
            agg_trades_dir(Path::new("/csv"), "BTCUSDT"),
            PathBuf::from("/csv/data/futures/um/daily/aggTrades/BTCUSDT")
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure_dirs().unwrap();
        for root in layout.intermediate_roots() {
            assert!(root.is_dir());
        }
        assert!(layout.final_root().is_dir());
    }
}
