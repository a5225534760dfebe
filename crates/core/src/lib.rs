pub mod config;
pub mod config_loader;
pub mod error;
pub mod time_grid;
pub mod traits;

pub use config::{
    BatchConfig, ConcurrencyConfig, EtlConfig, RunConfig, StorageConfig, TardisConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, EtlError, FetchError, Result};
pub use time_grid::{day_bounds, settlement_timestamp_millis, HOURS_PER_DAY};
pub use traits::{Fetcher, SymbolFetch};
