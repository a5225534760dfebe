//! File-level data handling for the funding-rate ETL.
//!
//! This crate provides:
//! - Availability index and exchange symbol listing
//! - Funding-rate data models
//! - Hourly resampler and file conversion
//! - CSV storage, gzip extraction and day archives
//! - aggTrades zip extraction
//! - The on-disk directory layout

pub mod archive;
pub mod availability;
pub mod convert;
pub mod csv_storage;
pub mod error;
pub mod extract;
pub mod layout;
pub mod models;
pub mod resampler;
pub mod unzip;

// Re-export commonly used types
pub use archive::ArchiveWriter;
pub use availability::{AvailabilityIndex, SymbolListing};
pub use convert::{convert_file, convert_tree, ConvertError, ConvertTreeStats, ConvertedFile};
pub use csv_storage::CsvStorage;
pub use error::DataError;
pub use extract::gunzip_file;
pub use layout::{
    agg_trades_dir, agg_trades_zip_path, archive_entry_name, fetched_file_path, DataLayout,
};
pub use resampler::{resample_hourly, IncompleteDataError, ResampledDay};
pub use unzip::{unzip_agg_trades, unzip_file, UnzipStats, UnzipWarning};

// Re-export models
pub use models::{HourlySlot, OutputRecord, RawObservation};
