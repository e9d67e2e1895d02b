pub mod cleaner;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod tasks;
pub mod types;

pub use cleaner::{clean_batch, run_batch, BatchOutcome, BatchStats, Cleaner};
pub use config::AppConfig;
pub use crawler::{crawl, Crawler, RecordSource};
pub use error::{PipelineError, Result};
pub use tasks::{TaskReport, TaskStatus};
pub use types::{FetchParams, Record, RecordExt};
