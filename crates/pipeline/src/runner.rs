//! Multi-day driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use market_etl_core::error::{ConfigError, EtlError};
use market_etl_core::time_grid::days_inclusive;
use market_etl_data::AvailabilityIndex;

use crate::day_pipeline::DayPipeline;
use crate::report::DayReport;

/// Totals for a run over a day range.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub succeeded: Vec<NaiveDate>,
    pub failed: Vec<NaiveDate>,
    /// Days with no eligible symbols.
    pub skipped: Vec<NaiveDate>,
    pub cancelled: bool,
    pub reports: Vec<DayReport>,
}

impl RunSummary {
    /// 0 when no day failed and the run was not cancelled, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.failed.is_empty() || self.cancelled)
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} days succeeded, {} failed, {} skipped{}",
            self.succeeded.len(),
            self.failed.len(),
            self.skipped.len(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

/// Runs DayUnits strictly one after another.
pub struct Runner<'a> {
    pipeline: DayPipeline,
    index: &'a AvailabilityIndex,
    stop: Arc<AtomicBool>,
}

impl<'a> Runner<'a> {
    pub fn new(pipeline: DayPipeline, index: &'a AvailabilityIndex) -> Self {
        Self {
            pipeline,
            index,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between days; setting it stops the run after the day in
    /// flight finishes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Processes every day of `[start, end]`.
    ///
    /// # Errors
    /// Returns [`EtlError::Config`] for an inverted range, before any day
    /// runs. Day failures are recorded in the summary instead.
    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<RunSummary, EtlError> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end }.into());
        }

        let mut summary = RunSummary::default();
        for day in days_inclusive(start, end) {
            if self.stop.load(Ordering::SeqCst) {
                warn!(%day, "Stop requested, not starting remaining days");
                summary.cancelled = true;
                break;
            }

            let symbols = self.index.symbols_for(day);
            if symbols.is_empty() {
                info!(%day, "No eligible symbols, skipping");
                summary.skipped.push(day);
                continue;
            }

            match self.pipeline.run_day(day, &symbols).await {
                Ok(report) => {
                    if report.succeeded() {
                        summary.succeeded.push(day);
                    } else {
                        warn!("Day failed: {}", report.summary());
                        summary.failed.push(day);
                    }
                    summary.reports.push(report);
                }
                Err(e) if e.is_run_fatal() => return Err(e),
                Err(e) => {
                    error!(%day, "Day failed: {e}");
                    summary.failed.push(day);
                }
            }
        }

        info!("{}", summary.summary());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market_etl_core::error::FetchError;
    use market_etl_core::traits::{Fetcher, SymbolFetch};
    use market_etl_data::DataLayout;
    use std::path::Path;
    use tempfile::TempDir;

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, _: &[String], _: NaiveDate) -> Result<Vec<SymbolFetch>, FetchError> {
            Err(FetchError::Unauthorized { status_code: 401 })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn index() -> AvailabilityIndex {
        let csv = "date,AAA\n2025-06-01,1\n2025-06-02,0\n2025-06-03,1\n";
        AvailabilityIndex::from_reader(csv.as_bytes(), Path::new("m.csv")).unwrap()
    }

    fn runner<'a>(dir: &TempDir, index: &'a AvailabilityIndex) -> Runner<'a> {
        let pipeline = DayPipeline::new(Arc::new(FailingFetcher), DataLayout::new(dir.path()), 1);
        Runner::new(pipeline, index)
    }

    #[tokio::test]
    async fn test_inverted_range_fails_before_any_day() {
        let dir = TempDir::new().unwrap();
        let index = index();
        let err = runner(&dir, &index).run(d(3), d(1)).await.unwrap_err();
        assert!(err.is_run_fatal());
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_day_and_continues() {
        let dir = TempDir::new().unwrap();
        let index = index();
        let summary = runner(&dir, &index).run(d(1), d(4)).await.unwrap();
        assert_eq!(summary.failed, vec![d(1), d(3)]);
        // 06-02 all zero, 06-04 absent from the matrix
        assert_eq!(summary.skipped, vec![d(2), d(4)]);
        assert_eq!(summary.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_stop_flag_cancels_before_next_day() {
        let dir = TempDir::new().unwrap();
        let index = index();
        let runner = runner(&dir, &index);
        runner.stop_handle().store(true, Ordering::SeqCst);
        let summary = runner.run(d(1), d(3)).await.unwrap();
        assert!(summary.cancelled);
        assert!(summary.failed.is_empty() && summary.skipped.is_empty());
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_clean_run() {
        let summary = RunSummary {
            succeeded: vec![d(1)],
            skipped: vec![d(2)],
            ..RunSummary::default()
        };
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.summary(), "1 days succeeded, 0 failed, 1 skipped");
    }
}
