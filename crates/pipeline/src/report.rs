//! Per-day outcome records.
//!
//! Stage-local problems never abort a day; they are collected here and the
//! day verdict is derived from the counts.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use market_etl_data::IncompleteDataError;

/// Pipeline stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Convert,
    Archive,
    Purge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Convert => "convert",
            Self::Archive => "archive",
            Self::Purge => "purge",
        };
        f.write_str(name)
    }
}

/// A non-fatal, per-symbol or per-stage problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageWarning {
    /// Symbol still has no fetched file after the fetch stage.
    #[error("{symbol}: not fetched ({reason})")]
    FetchMiss { symbol: String, reason: String },

    /// Fetched file missing or not decompressible.
    #[error("{symbol}: extract failed: {reason}")]
    Extract { symbol: String, reason: String },

    /// Raw file unreadable, malformed or unusable; no output written.
    #[error("{symbol}: convert failed: {reason}")]
    Convert { symbol: String, reason: String },

    /// Raw file parsed but the day cannot be resampled; no output written.
    #[error("{symbol}: skipped: {error}")]
    Skipped {
        symbol: String,
        error: IncompleteDataError,
    },

    /// Output written but some hours were filled from neighbours.
    #[error("{symbol}: only {observed_hours}/24 hours observed")]
    IncompleteData { symbol: String, observed_hours: usize },

    /// No output file existed to archive.
    #[error("nothing to archive")]
    Archive,

    /// The day archive could not be written; outputs are kept.
    #[error("archive failed: {reason}")]
    ArchiveFailed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Symbols whose target already existed.
    pub already_present: usize,
    /// Symbols passed to the fetcher.
    pub requested: usize,
    pub downloaded: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// What happened to one purge target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Deleted,
    Absent,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub files: Vec<(PathBuf, PurgeOutcome)>,
    /// Directories removed because they became empty.
    pub dirs_removed: usize,
}

impl PurgeReport {
    pub fn record(&mut self, path: PathBuf, outcome: PurgeOutcome) {
        self.files.push((path, outcome));
    }

    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, PurgeOutcome::Deleted))
    }

    #[must_use]
    pub fn absent(&self) -> usize {
        self.count(|o| matches!(o, PurgeOutcome::Absent))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PurgeOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&PurgeOutcome) -> bool) -> usize {
        self.files.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Outcome of one DayUnit that was not fatally interrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub day: NaiveDate,
    pub symbols: usize,
    pub fetch: FetchReport,
    pub extracted: usize,
    pub converted: usize,
    pub archived: usize,
    pub purge: Option<PurgeReport>,
    pub warnings: Vec<StageWarning>,
    /// Stage after which the remaining stages were skipped.
    pub aborted_at: Option<Stage>,
}

impl DayReport {
    #[must_use]
    pub fn new(day: NaiveDate, symbols: usize) -> Self {
        Self {
            day,
            symbols,
            fetch: FetchReport::default(),
            extracted: 0,
            converted: 0,
            archived: 0,
            purge: None,
            warnings: Vec::new(),
            aborted_at: None,
        }
    }

    /// A day succeeds when at least one file got through extract and convert.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.extracted > 0 && self.converted > 0
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{}: {} symbols, fetched {} (present {}, missing {}, failed {}), extracted {}, converted {}, archived {}",
            self.day,
            self.symbols,
            self.fetch.downloaded,
            self.fetch.already_present,
            self.fetch.not_found,
            self.fetch.failed,
            self.extracted,
            self.converted,
            self.archived,
        );
        if let Some(purge) = &self.purge {
            s.push_str(&format!(
                ", purged {} (absent {}, failed {})",
                purge.deleted(),
                purge.absent(),
                purge.failed()
            ));
        }
        if let Some(stage) = self.aborted_at {
            s.push_str(&format!(", aborted after {stage}"));
        }
        s
    }
}
