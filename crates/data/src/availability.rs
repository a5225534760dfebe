//! Availability index: which symbols have data on which day.
//!
//! The matrix is a CSV whose first column holds ISO dates and whose header
//! row names one symbol per remaining column. A cell equal to `1` marks the
//! symbol as available that day.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use market_etl_core::error::ConfigError;
use market_etl_core::time_grid::parse_day;

/// Listing lead time required before a symbol counts as eligible.
pub const LISTING_LOOKBACK_DAYS: u64 = 180;

/// Immutable day × symbol availability flags.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    symbols: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<bool>>,
}

impl AvailabilityIndex {
    /// Loads the matrix from a CSV file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Matrix`] if the file cannot be opened or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConfigError::matrix(path, e.to_string()))?;
        let index = Self::from_reader(file, path)?;
        info!(
            path = %path.display(),
            days = index.len(),
            symbols = index.symbols.len(),
            "Loaded availability matrix"
        );
        Ok(index)
    }

    /// Parses the matrix from any reader. `path` is used in error messages.
    ///
    /// # Errors
    /// Returns [`ConfigError::Matrix`] on malformed content.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ConfigError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| ConfigError::matrix(path, e.to_string()))?;
        if headers.len() < 2 {
            return Err(ConfigError::matrix(path, "no symbol columns"));
        }
        let symbols: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows = BTreeMap::new();
        for (i, record) in rdr.records().enumerate() {
            let line = i + 2;
            let record = record.map_err(|e| ConfigError::matrix(path, e.to_string()))?;
            let date_cell = record.get(0).unwrap_or_default();
            let day = parse_day(date_cell).map_err(|_| {
                ConfigError::matrix(path, format!("line {line}: invalid date '{date_cell}'"))
            })?;

            let mut flags = Vec::with_capacity(symbols.len());
            for (col, symbol) in symbols.iter().enumerate() {
                let cell = record.get(col + 1).unwrap_or_default();
                flags.push(parse_flag(cell).ok_or_else(|| {
                    ConfigError::matrix(
                        path,
                        format!("line {line}: invalid flag '{cell}' for {symbol}"),
                    )
                })?);
            }
            if rows.insert(day, flags).is_some() {
                debug!(%day, "Duplicate matrix row, keeping the later one");
            }
        }

        Ok(Self { symbols, rows })
    }

    /// Symbols flagged available on `day`, in column order.
    ///
    /// A day with no row yields an empty list.
    #[must_use]
    pub fn symbols_for(&self, day: NaiveDate) -> Vec<String> {
        let Some(flags) = self.rows.get(&day) else {
            return Vec::new();
        };
        self.symbols
            .iter()
            .zip(flags)
            .filter(|(_, flag)| **flag)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Symbols flagged on at least one day of the inclusive range, in column
    /// order.
    #[must_use]
    pub fn symbols_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        if start > end {
            return Vec::new();
        }
        let mut needed = vec![false; self.symbols.len()];
        for flags in self.rows.range(start..=end).map(|(_, flags)| flags) {
            for (need, flag) in needed.iter_mut().zip(flags) {
                *need |= *flag;
            }
        }
        self.symbols
            .iter()
            .zip(needed)
            .filter(|(_, need)| *need)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// All symbol columns.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Days with a matrix row, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Number of day rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_flag(cell: &str) -> Option<bool> {
    if cell.is_empty() {
        return Some(false);
    }
    cell.parse::<f64>().ok().map(|v| v == 1.0)
}

/// One row of an exchange symbol listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListedSymbol {
    pub symbol: String,
    #[serde(rename = "availableSince")]
    pub available_since: String,
    #[serde(rename = "availableTo")]
    pub available_to: String,
}

/// Exchange symbol listing with listing/delisting dates.
#[derive(Debug, Clone, Default)]
pub struct SymbolListing {
    entries: Vec<(String, NaiveDate, NaiveDate)>,
}

impl SymbolListing {
    /// Loads a `symbol,availableSince,availableTo` CSV.
    ///
    /// Only the leading `YYYY-MM-DD` of each date cell is read, so full
    /// timestamps are accepted.
    ///
    /// # Errors
    /// Returns [`ConfigError::Matrix`] on unreadable files or bad dates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConfigError::matrix(path, e.to_string()))?;
        Self::from_reader(file, path)
    }

    /// Parses a listing from any reader.
    ///
    /// # Errors
    /// Returns [`ConfigError::Matrix`] on malformed content.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ConfigError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();
        for row in rdr.deserialize::<ListedSymbol>() {
            let row = row.map_err(|e| ConfigError::matrix(path, e.to_string()))?;
            let since = listing_date(&row.available_since)
                .ok_or_else(|| ConfigError::matrix(path, format!("{}: bad availableSince", row.symbol)))?;
            let to = listing_date(&row.available_to)
                .ok_or_else(|| ConfigError::matrix(path, format!("{}: bad availableTo", row.symbol)))?;
            entries.push((row.symbol, since, to));
        }
        Ok(Self { entries })
    }

    /// Symbols listed at least [`LISTING_LOOKBACK_DAYS`] before `start` and
    /// still listed on `end`.
    #[must_use]
    pub fn eligible(&self, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let cutoff = start
            .checked_sub_days(Days::new(LISTING_LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);
        self.entries
            .iter()
            .filter(|(_, since, to)| *since <= cutoff && *to >= end)
            .map(|(symbol, _, _)| symbol.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn listing_date(cell: &str) -> Option<NaiveDate> {
    parse_day(cell.get(..10)?).ok()
}
