//! One DayUnit: fetch → extract → convert → archive → purge.

use std::io;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use market_etl_core::error::EtlError;
use market_etl_core::traits::{Fetcher, SymbolFetch};
use market_etl_data::convert::{convert_file, ConvertError, ConvertedFile};
use market_etl_data::{gunzip_file, ArchiveWriter, DataError, DataLayout};

use crate::purge::purge_day;
use crate::report::{DayReport, FetchReport, PurgeReport, Stage, StageWarning};

/// Runs the stages of one day over a fixed symbol set.
pub struct DayPipeline {
    fetcher: Arc<dyn Fetcher>,
    layout: DataLayout,
    convert_workers: usize,
}

impl DayPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, layout: DataLayout, convert_workers: usize) -> Self {
        Self {
            fetcher,
            layout,
            convert_workers: convert_workers.max(1),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Runs every stage for `day`.
    ///
    /// Per-symbol failures are collected in the report. When extract or
    /// convert produce nothing, or the archive cannot be written, the
    /// remaining stages are skipped and the intermediates stay on disk for a
    /// re-run.
    ///
    /// # Errors
    /// Returns [`EtlError::Fetch`] when the fetcher fails as a whole.
    pub async fn run_day(&self, day: NaiveDate, symbols: &[String]) -> Result<DayReport, EtlError> {
        let mut report = DayReport::new(day, symbols.len());
        info!(%day, symbols = symbols.len(), fetcher = self.fetcher.name(), "Processing day");

        report.fetch = self.fetch(day, symbols, &mut report.warnings).await?;

        report.extracted = self.extract(day, symbols, &mut report.warnings).await?;
        if report.extracted == 0 {
            warn!(%day, "Nothing extracted, skipping remaining stages");
            report.aborted_at = Some(Stage::Extract);
            return Ok(report);
        }

        report.converted = self.convert(day, symbols, &mut report.warnings).await?;
        if report.converted == 0 {
            warn!(%day, "Nothing converted, skipping remaining stages");
            report.aborted_at = Some(Stage::Convert);
            return Ok(report);
        }

        report.archived = match self.archive(day, symbols).await? {
            Ok(count) => count,
            Err(e) => {
                warn!(%day, error = %e, "Archive failed, keeping outputs");
                report.warnings.push(StageWarning::ArchiveFailed {
                    reason: e.to_string(),
                });
                report.aborted_at = Some(Stage::Archive);
                return Ok(report);
            }
        };
        if report.archived == 0 {
            warn!(%day, "No output files to archive");
            report.warnings.push(StageWarning::Archive);
        }

        report.purge = Some(self.purge(day, symbols).await?);

        info!("{}", report.summary());
        Ok(report)
    }

    /// Fetches symbols whose target is not already on disk.
    async fn fetch(
        &self,
        day: NaiveDate,
        symbols: &[String],
        warnings: &mut Vec<StageWarning>,
    ) -> Result<FetchReport, EtlError> {
        let mut fetch = FetchReport::default();
        let missing: Vec<String> = symbols
            .iter()
            .filter(|s| !self.layout.fetched_path(s, day).is_file())
            .cloned()
            .collect();
        fetch.already_present = symbols.len() - missing.len();
        fetch.requested = missing.len();

        if missing.is_empty() {
            debug!(%day, "All fetch targets already present");
            return Ok(fetch);
        }

        let results = self
            .fetcher
            .fetch(&missing, day)
            .await
            .map_err(|e| EtlError::fetch(day, e))?;

        for result in &results {
            match result {
                SymbolFetch::Downloaded { .. } => fetch.downloaded += 1,
                SymbolFetch::NotFound { .. } => fetch.not_found += 1,
                SymbolFetch::Failed { .. } => fetch.failed += 1,
            }
        }

        for symbol in &missing {
            if self.layout.fetched_path(symbol, day).is_file() {
                continue;
            }
            let reason = match results.iter().find(|r| r.symbol() == symbol.as_str()) {
                Some(SymbolFetch::NotFound { .. }) => "not available from vendor".to_string(),
                Some(SymbolFetch::Failed { reason, .. }) => reason.clone(),
                Some(SymbolFetch::Downloaded { .. }) => "reported downloaded but file is absent".to_string(),
                None => "not reported by fetcher".to_string(),
            };
            warnings.push(StageWarning::FetchMiss {
                symbol: symbol.clone(),
                reason,
            });
        }

        info!(
            %day,
            requested = fetch.requested,
            downloaded = fetch.downloaded,
            not_found = fetch.not_found,
            failed = fetch.failed,
            "Fetch finished"
        );
        Ok(fetch)
    }

    async fn extract(
        &self,
        day: NaiveDate,
        symbols: &[String],
        warnings: &mut Vec<StageWarning>,
    ) -> Result<usize, EtlError> {
        let layout = self.layout.clone();
        let symbols = symbols.to_vec();

        let outcomes = blocking(move || {
            symbols
                .into_iter()
                .map(|symbol| {
                    let src = layout.fetched_path(&symbol, day);
                    let result = if src.is_file() {
                        gunzip_file(&src, &layout.extracted_path(&symbol, day))
                            .map_err(|e| e.to_string())
                    } else {
                        Err("fetched file missing".to_string())
                    };
                    (symbol, result)
                })
                .collect::<Vec<_>>()
        })
        .await?;

        let mut extracted = 0;
        for (symbol, result) in outcomes {
            match result {
                Ok(_) => extracted += 1,
                Err(reason) => {
                    debug!(%symbol, %day, "Extract failed: {reason}");
                    warnings.push(StageWarning::Extract { symbol, reason });
                }
            }
        }
        info!(%day, extracted, "Extract finished");
        Ok(extracted)
    }

    /// Converts symbols with an extracted file on a bounded pool of blocking
    /// workers.
    async fn convert(
        &self,
        day: NaiveDate,
        symbols: &[String],
        warnings: &mut Vec<StageWarning>,
    ) -> Result<usize, EtlError> {
        let jobs = symbols.iter().cloned().map(|symbol| {
            let src = self.layout.extracted_path(&symbol, day);
            let dest = self.layout.output_path(&symbol, day);
            async move {
                let result = if src.is_file() {
                    blocking(move || convert_file(&src, &dest, day)).await
                } else {
                    Ok(Err(ConvertError::Data(DataError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        "extracted file missing",
                    )))))
                };
                (symbol, result)
            }
        });

        let outcomes: Vec<(String, Result<Result<ConvertedFile, ConvertError>, EtlError>)> =
            stream::iter(jobs)
                .buffer_unordered(self.convert_workers)
                .collect()
                .await;

        let mut converted = 0;
        for (symbol, result) in outcomes {
            match result? {
                Ok(file) => {
                    converted += 1;
                    if !file.is_complete() {
                        warnings.push(StageWarning::IncompleteData {
                            symbol,
                            observed_hours: file.observed_hours,
                        });
                    }
                }
                Err(ConvertError::Incomplete(error)) => {
                    debug!(%symbol, %day, "Convert skipped: {error}");
                    warnings.push(StageWarning::Skipped { symbol, error });
                }
                Err(e) => {
                    debug!(%symbol, %day, "Convert failed: {e}");
                    warnings.push(StageWarning::Convert {
                        symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(%day, converted, "Convert finished");
        Ok(converted)
    }

    async fn archive(
        &self,
        day: NaiveDate,
        symbols: &[String],
    ) -> Result<Result<usize, DataError>, EtlError> {
        let layout = self.layout.clone();
        let symbols = symbols.to_vec();
        blocking(move || ArchiveWriter::new(&layout).archive_day(day, &symbols)).await
    }

    async fn purge(
        &self,
        day: NaiveDate,
        symbols: &[String],
    ) -> Result<PurgeReport, EtlError> {
        let layout = self.layout.clone();
        let symbols = symbols.to_vec();
        blocking(move || purge_day(&layout, day, &symbols)).await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, EtlError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EtlError::Io(io::Error::other(e)))
}
