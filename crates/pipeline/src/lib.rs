//! Daily funding-rate ETL: per-day stage pipeline, multi-day runner and the
//! fetch collaborators it drives.

pub mod batch;
pub mod day_pipeline;
pub mod fetch;
pub mod purge;
pub mod report;
pub mod runner;

pub use batch::{BatchFetcher, BatchReport, BatchTask, TaskOutcome};
pub use day_pipeline::DayPipeline;
pub use fetch::{BinancePublicFetcher, RangeDownload, TardisFetcher};
pub use purge::purge_day;
pub use report::{DayReport, FetchReport, PurgeOutcome, PurgeReport, Stage, StageWarning};
pub use runner::{RunSummary, Runner};
