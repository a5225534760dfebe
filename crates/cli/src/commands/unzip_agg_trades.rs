//! Unzips downloaded aggTrades archives into the CSV tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use market_etl_core::time_grid::{monthly_intervals, parse_day};
use market_etl_core::ConfigLoader;
use market_etl_data::{unzip_agg_trades, UnzipStats, UnzipWarning};

use super::download_agg_trades::SymbolSource;

/// Arguments for the unzip-agg-trades command.
#[derive(Args, Debug, Clone)]
pub struct UnzipAggTradesArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Zip root (defaults to batch.download_root)
    #[arg(long)]
    pub zip_root: Option<PathBuf>,

    /// CSV destination root (defaults to batch.extract_root)
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Explicit symbols, comma separated
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Pick each month's symbols from an availability matrix
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Pick each month's symbols from a symbol listing
    #[arg(long)]
    pub listing: Option<PathBuf>,
}

/// Runs the unzip-agg-trades command and returns the process exit code.
///
/// Missing archives are logged and skipped. Corrupt archives are logged and
/// make the exit code non-zero.
///
/// # Errors
/// Returns an error for invalid dates, configuration or symbol sources.
pub async fn run_unzip_agg_trades(args: UnzipAggTradesArgs) -> Result<i32> {
    let start = parse_day(&args.start).with_context(|| format!("Invalid start date '{}'", args.start))?;
    let end = parse_day(&args.end).with_context(|| format!("Invalid end date '{}'", args.end))?;
    if start > end {
        bail!("Start date {start} is after end date {end}");
    }

    let config = ConfigLoader::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    let zip_root = args.zip_root.clone().unwrap_or_else(|| config.batch.download_root.clone());
    let dest = args.dest.clone().unwrap_or_else(|| config.batch.extract_root.clone());
    let source = SymbolSource::from_parts(&args.symbols, args.matrix.as_deref(), args.listing.as_deref())?;

    info!(
        "Unzipping aggTrades {} to {} from {} into {}",
        start,
        end,
        zip_root.display(),
        dest.display()
    );

    let mut total = UnzipStats::default();
    for (month_start, month_end) in monthly_intervals(start, end) {
        let symbols = source.symbols(month_start, month_end);
        let (zip_root, dest) = (zip_root.clone(), dest.clone());
        let stats = tokio::task::spawn_blocking(move || {
            unzip_agg_trades(&zip_root, &dest, &symbols, month_start, month_end)
        })
        .await
        .context("Unzip worker panicked")?;

        total.extracted += stats.extracted;
        total.skipped += stats.skipped;
        total.entries += stats.entries;
        total.warnings.extend(stats.warnings);
    }

    for warning in &total.warnings {
        warn!("{warning}");
    }
    info!("{}", total.summary());

    let corrupt = total
        .warnings
        .iter()
        .any(|w| matches!(w, UnzipWarning::Corrupt { .. }));
    Ok(i32::from(corrupt))
}
