//! Bulk aggTrades download from the public Binance data bucket.
//!
//! The range is split into calendar months; each month's symbols are
//! downloaded by a bounded worker pool with retries.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use market_etl_core::time_grid::{monthly_intervals, parse_day};
use market_etl_core::ConfigLoader;
use market_etl_data::{AvailabilityIndex, SymbolListing};
use market_etl_pipeline::fetch::binance_public::DEFAULT_BASE_URL;
use market_etl_pipeline::{BatchFetcher, BatchTask, BinancePublicFetcher, RangeDownload, TaskOutcome};

/// Arguments for the download-agg-trades command.
#[derive(Args, Debug, Clone)]
pub struct DownloadAggTradesArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Download root (defaults to batch.download_root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Explicit symbols, comma separated
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Pick each month's symbols from an availability matrix
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Pick each month's symbols from a symbol listing
    /// (symbol,availableSince,availableTo)
    #[arg(long)]
    pub listing: Option<PathBuf>,

    /// Bucket base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Parallel symbol downloads
    #[arg(long)]
    pub max_workers: Option<usize>,
}

/// Where a bulk aggTrades command takes its symbols from.
pub(crate) enum SymbolSource {
    Fixed(Vec<String>),
    Matrix(AvailabilityIndex),
    Listing(SymbolListing),
}

impl SymbolSource {
    pub(crate) fn from_parts(
        symbols: &[String],
        matrix: Option<&Path>,
        listing: Option<&Path>,
    ) -> Result<Self> {
        if !symbols.is_empty() {
            return Ok(Self::Fixed(symbols.to_vec()));
        }
        if let Some(path) = matrix {
            return Ok(Self::Matrix(AvailabilityIndex::load(path)?));
        }
        if let Some(path) = listing {
            return Ok(Self::Listing(SymbolListing::load(path)?));
        }
        bail!("One of --symbols, --matrix or --listing is required");
    }

    fn from_args(args: &DownloadAggTradesArgs) -> Result<Self> {
        Self::from_parts(&args.symbols, args.matrix.as_deref(), args.listing.as_deref())
    }

    pub(crate) fn symbols(&self, start: chrono::NaiveDate, end: chrono::NaiveDate) -> Vec<String> {
        match self {
            Self::Fixed(symbols) => symbols.clone(),
            Self::Matrix(index) => index.symbols_in_range(start, end),
            Self::Listing(listing) => listing.eligible(start, end),
        }
    }
}

#[derive(Debug, Default)]
struct DownloadStats {
    months: usize,
    totals: RangeDownload,
    failed_tasks: usize,
    timed_out_tasks: usize,
}

impl DownloadStats {
    fn summary(&self) -> String {
        format!(
            "{} months: {} files downloaded ({} MB), {} already present, {} not published, {} tasks failed, {} timed out",
            self.months,
            self.totals.downloaded,
            self.totals.bytes / 1_000_000,
            self.totals.skipped,
            self.totals.missing,
            self.failed_tasks,
            self.timed_out_tasks
        )
    }
}

/// Runs the download-agg-trades command and returns the process exit code.
///
/// # Errors
/// Returns an error for invalid dates, configuration or symbol sources.
pub async fn run_download_agg_trades(args: DownloadAggTradesArgs) -> Result<i32> {
    let start = parse_day(&args.start).with_context(|| format!("Invalid start date '{}'", args.start))?;
    let end = parse_day(&args.end).with_context(|| format!("Invalid end date '{}'", args.end))?;
    if start > end {
        bail!("Start date {start} is after end date {end}");
    }

    let mut config = ConfigLoader::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(n) = args.max_workers {
        config.batch.max_workers = n;
    }
    let root = args.root.clone().unwrap_or_else(|| config.batch.download_root.clone());
    let source = SymbolSource::from_args(&args)?;

    let fetcher = BinancePublicFetcher::new(
        &args.base_url,
        &root,
        Duration::from_secs(config.batch.task_timeout_secs),
    )?;
    let batch = BatchFetcher::new(&config.batch);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current month...");
            stop_on_ctrl_c.store(true, Ordering::SeqCst);
        }
    });

    info!("Downloading aggTrades {} to {} into {}", start, end, root.display());

    let mut stats = DownloadStats::default();
    for (month_start, month_end) in monthly_intervals(start, end) {
        if stop.load(Ordering::SeqCst) {
            warn!("Stopped before {month_start}");
            return Ok(1);
        }

        let symbols = source.symbols(month_start, month_end);
        info!(
            "Period {} to {}: {} symbols",
            month_start,
            month_end,
            symbols.len()
        );
        let tasks = symbols
            .into_iter()
            .map(|symbol| BatchTask {
                symbol,
                start: month_start,
                end: month_end,
            })
            .collect();

        let fetcher = &fetcher;
        let report = batch
            .run(tasks, |task| async move {
                fetcher
                    .download_range(&task.symbol, task.start, task.end)
                    .await
            })
            .await;

        stats.months += 1;
        for (task, outcome) in &report.outcomes {
            match outcome {
                TaskOutcome::Completed { value, .. } => {
                    stats.totals.downloaded += value.downloaded;
                    stats.totals.skipped += value.skipped;
                    stats.totals.missing += value.missing;
                    stats.totals.bytes += value.bytes;
                }
                TaskOutcome::Failed { error, attempts } => {
                    stats.failed_tasks += 1;
                    warn!("{task}: failed after {attempts} attempts: {error}");
                }
                TaskOutcome::TimedOut { .. } => {
                    stats.timed_out_tasks += 1;
                    warn!("{task}: timed out");
                }
            }
        }
    }

    info!("{}", stats.summary());
    Ok(i32::from(stats.failed_tasks + stats.timed_out_tasks > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: DownloadAggTradesArgs,
    }

    #[test]
    fn test_symbols_flag_split() {
        let cli = TestCli::parse_from([
            "test",
            "--start",
            "2025-01-01",
            "--end",
            "2025-02-28",
            "--symbols",
            "BTCUSDT,ETHUSDT",
        ]);
        assert_eq!(cli.args.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(cli.args.base_url, DEFAULT_BASE_URL);
        let source = SymbolSource::from_args(&cli.args).unwrap();
        let day = parse_day("2025-01-01").unwrap();
        assert_eq!(source.symbols(day, day).len(), 2);
    }

    #[test]
    fn test_symbol_source_required() {
        let cli = TestCli::parse_from(["test", "--start", "2025-01-01", "--end", "2025-01-31"]);
        assert!(SymbolSource::from_args(&cli.args).is_err());
    }
}
