//! Daily funding-rate ETL command.
//!
//! For every day in the range: fetch the eligible symbols' derivative-ticker
//! files from Tardis, extract, resample to hourly rows, archive the day and
//! delete the intermediates.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use secrecy::SecretString;
use tracing::{info, warn};

use market_etl_core::time_grid::parse_day;
use market_etl_core::{ConfigLoader, EtlConfig};
use market_etl_data::{AvailabilityIndex, DataLayout};
use market_etl_pipeline::{DayPipeline, Runner, TardisFetcher};

/// Arguments for the funding-rate command.
#[derive(Args, Debug, Clone)]
pub struct FundingRateArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Storage base path for download/extract/output/final
    #[arg(long)]
    pub base_path: Option<PathBuf>,

    /// Availability matrix CSV
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Tardis.dev API key
    #[arg(long, env = "TARDIS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Parallel downloads per day
    #[arg(long)]
    pub fetch_concurrency: Option<usize>,

    /// Blocking workers for conversion
    #[arg(long)]
    pub convert_workers: Option<usize>,

    /// Process only the start day
    #[arg(long, default_value = "false")]
    pub test_mode: bool,
}

impl FundingRateArgs {
    /// Applies command-line values over the loaded configuration.
    ///
    /// # Errors
    /// Returns an error if a date flag is not `YYYY-MM-DD`.
    pub fn apply(&self, config: &mut EtlConfig) -> Result<()> {
        if let Some(start) = &self.start {
            config.run.start_date =
                parse_day(start).with_context(|| format!("Invalid start date '{start}'"))?;
        }
        if let Some(end) = &self.end {
            config.run.end_date =
                parse_day(end).with_context(|| format!("Invalid end date '{end}'"))?;
        }
        if self.test_mode {
            config.run.test_mode = true;
        }
        if let Some(path) = &self.base_path {
            config.storage.base_path = path.clone();
        }
        if let Some(path) = &self.matrix {
            config.storage.matrix_path = path.clone();
        }
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            config.tardis.api_key = Some(SecretString::from(key.clone()));
        }
        if let Some(n) = self.fetch_concurrency {
            config.concurrency.fetch_concurrency = n;
        }
        if let Some(n) = self.convert_workers {
            config.concurrency.convert_workers = n;
        }
        Ok(())
    }
}

/// Runs the funding-rate command and returns the process exit code.
///
/// # Errors
/// Returns an error for invalid configuration, an unreadable matrix or a
/// storage root that cannot be created.
pub async fn run_funding_rate(args: FundingRateArgs) -> Result<i32> {
    let mut config = ConfigLoader::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    args.apply(&mut config)?;
    config.validate()?;

    let (start, end) = config.date_range();
    info!(
        "Funding-rate ETL {} to {}{} (base path {})",
        start,
        end,
        if config.run.test_mode { " [test mode]" } else { "" },
        config.base_path().display()
    );
    if config.tardis.api_key.is_none() {
        warn!("No Tardis API key set, requests are sent unauthenticated");
    }

    let index = AvailabilityIndex::load(&config.storage.matrix_path)?;

    let layout = DataLayout::new(config.base_path());
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create storage under {}", layout.base().display()))?;

    let fetcher = TardisFetcher::new(
        &config.tardis,
        layout.download_root(),
        config.concurrency.fetch_concurrency,
    )?;
    let pipeline = DayPipeline::new(
        Arc::new(fetcher),
        layout,
        config.concurrency.convert_workers,
    );
    let runner = Runner::new(pipeline, &index);

    let stop_on_ctrl_c = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current day...");
            stop_on_ctrl_c.store(true, Ordering::SeqCst);
        }
    });

    let summary = runner.run(start, end).await?;

    info!("Run finished: {}", summary.summary());
    if !summary.failed.is_empty() {
        warn!("Failed days: {:?}", summary.failed);
    }
    Ok(summary.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::ExposeSecret;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: FundingRateArgs,
    }

    #[test]
    fn test_flags_override_config() {
        let cli = TestCli::parse_from([
            "test",
            "--start",
            "2025-06-01",
            "--end",
            "2025-06-03",
            "--base-path",
            "/data",
            "--api-key",
            "k",
            "--convert-workers",
            "3",
            "--test-mode",
        ]);
        let mut config = EtlConfig::default();
        cli.args.apply(&mut config).unwrap();

        assert_eq!(config.run.start_date, parse_day("2025-06-01").unwrap());
        assert_eq!(config.date_range().1, parse_day("2025-06-01").unwrap());
        assert_eq!(config.storage.base_path, PathBuf::from("/data"));
        assert_eq!(config.tardis.api_key.as_ref().unwrap().expose_secret(), "k");
        assert_eq!(config.concurrency.convert_workers, 3);
    }

    #[test]
    fn test_bad_date_rejected() {
        let cli = TestCli::parse_from(["test", "--start", "06/01/2025"]);
        let mut config = EtlConfig::default();
        assert!(cli.args.apply(&mut config).is_err());
    }
}
