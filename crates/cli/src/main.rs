use clap::{Parser, Subcommand};

mod commands;

use commands::{ConvertArgs, DownloadAggTradesArgs, FundingRateArgs, UnzipAggTradesArgs};

#[derive(Parser)]
#[command(name = "market-etl")]
#[command(about = "Market data ETL: funding-rate daily pipeline and bulk downloads", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily funding-rate ETL over a date range
    FundingRate(FundingRateArgs),
    /// Convert extracted derivative-ticker files to hourly output files
    Convert(ConvertArgs),
    /// Download daily aggTrades archives from the public data bucket
    DownloadAggTrades(DownloadAggTradesArgs),
    /// Unzip downloaded aggTrades archives into a CSV tree
    UnzipAggTrades(UnzipAggTradesArgs),
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let exit_code = match cli.command {
        Commands::FundingRate(args) => commands::run_funding_rate(args).await?,
        Commands::Convert(args) => {
            commands::run_convert(args).await?;
            0
        }
        Commands::DownloadAggTrades(args) => commands::run_download_agg_trades(args).await?,
        Commands::UnzipAggTrades(args) => commands::run_unzip_agg_trades(args).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
