//! CLI commands for the market data ETL.

pub mod convert;
pub mod download_agg_trades;
pub mod funding_rate;
pub mod unzip_agg_trades;

pub use convert::{run_convert, ConvertArgs};
pub use download_agg_trades::{run_download_agg_trades, DownloadAggTradesArgs};
pub use funding_rate::{run_funding_rate, FundingRateArgs};
pub use unzip_agg_trades::{run_unzip_agg_trades, UnzipAggTradesArgs};
