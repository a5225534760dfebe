use crate::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// What happened to one symbol during a fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolFetch {
    /// File was downloaded and stored at its target path.
    Downloaded { symbol: String, bytes: u64 },
    /// Vendor has no file for this symbol and day.
    NotFound { symbol: String },
    /// Download failed for this symbol only.
    Failed { symbol: String, reason: String },
}

impl SymbolFetch {
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Downloaded { symbol, .. }
            | Self::NotFound { symbol }
            | Self::Failed { symbol, .. } => symbol,
        }
    }

    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Source of per-symbol compressed day files.
///
/// Implementations store each file at the deterministic target
/// `{root}/{symbol}/funding_rate/{day}.csv.gz`. Callers only pass symbols
/// whose target is not already present.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `symbols` for `day`.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the call as a whole fails; per-symbol
    /// problems are reported through [`SymbolFetch`] instead.
    async fn fetch(&self, symbols: &[String], day: NaiveDate)
        -> Result<Vec<SymbolFetch>, FetchError>;

    fn name(&self) -> &str;
}
