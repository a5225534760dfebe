//! Standalone conversion of an extract tree into hourly output files.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use market_etl_data::convert_tree;

/// Arguments for the convert command.
#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Root holding `{symbol}/funding_rate/{day}.csv`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Root receiving `{symbol}/{settlement_ms}.csv`
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Runs the convert command.
///
/// # Errors
/// Returns an error if the input root is missing or cannot be listed.
pub async fn run_convert(args: ConvertArgs) -> Result<()> {
    if !args.input.is_dir() {
        bail!("Input directory {} does not exist", args.input.display());
    }
    info!(
        "Converting {} -> {}",
        args.input.display(),
        args.output.display()
    );

    let input = args.input.clone();
    let output = args.output.clone();
    let stats = tokio::task::spawn_blocking(move || convert_tree(&input, &output))
        .await
        .context("Conversion worker panicked")?
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    info!("{}", stats.summary());
    Ok(())
}
