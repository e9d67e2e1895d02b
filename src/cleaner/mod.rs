//! Clean → normalize → validate pipelines for structured records.
//!
//! Each cleaner variant implements [`Cleaner`]; [`run_batch`] drives a batch
//! through the three stages with per-record failure isolation.

pub mod content;
pub mod factor;
pub mod market;
pub mod news;
pub mod user;
pub mod utils;

pub use content::ContentCleaner;
pub use factor::FactorDataCleaner;
pub use market::{HighLowPolicy, MarketDataCleaner};
pub use news::NewsCleaner;
pub use user::UserDataCleaner;

use crate::error::Result;
use crate::types::Record;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Per-record contract shared by every cleaner variant
pub trait Cleaner: Send + Sync {
    /// Short component name, e.g. `market` or `news`
    fn name(&self) -> &str;

    /// Domain-specific corrections. Fails only on input shapes the variant
    /// cannot interpret; the batch driver skips such records.
    fn clean(&self, record: Record) -> Result<Record>;

    /// Defaulting and derivation over a cleaned record
    fn normalize(&self, record: Record) -> Record {
        record
    }

    /// Accept or reject a normalized record
    fn validate(&self, _record: &Record) -> bool {
        true
    }

    /// Name used in log fields and metric labels
    fn component(&self) -> String {
        format!("cleaner.{}", self.name())
    }

    /// Clean a batch, returning only the accepted records in input order
    fn clean_batch(&self, records: Vec<Record>) -> Vec<Record> {
        run_batch(self, records).records
    }
}

/// Counts for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub accepted: usize,
    /// Records that completed cleaning but failed validation
    pub rejected: usize,
    /// Records whose `clean` step returned an error
    pub failed: usize,
}

/// Accepted records plus the counts behind them
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<Record>,
    pub stats: BatchStats,
}

/// Run one record through clean, normalize and validate.
/// `Ok(None)` means the record was rejected by validation.
pub fn process_record<C: Cleaner + ?Sized>(cleaner: &C, record: Record) -> Result<Option<Record>> {
    let cleaned = cleaner.clean(record)?;
    let normalized = cleaner.normalize(cleaned);
    Ok(cleaner.validate(&normalized).then_some(normalized))
}

/// Drive a batch through the cleaner. A failing or rejected record is logged
/// with its index and skipped; the rest of the batch is unaffected.
#[instrument(skip_all, fields(component = %cleaner.component(), total = records.len()))]
pub fn run_batch<C: Cleaner + ?Sized>(cleaner: &C, records: Vec<Record>) -> BatchOutcome {
    let mut stats = BatchStats {
        total: records.len(),
        ..BatchStats::default()
    };
    let mut accepted = Vec::with_capacity(records.len());

    for (idx, record) in records.into_iter().enumerate() {
        match process_record(cleaner, record) {
            Ok(Some(normalized)) => accepted.push(normalized),
            Ok(None) => {
                stats.rejected += 1;
                warn!(index = idx, "Validation failed for record {}", idx);
            }
            Err(e) => {
                stats.failed += 1;
                error!(index = idx, "Error cleaning record {}: {}", idx, e);
            }
        }
    }

    stats.accepted = accepted.len();
    info!("Cleaned {}/{} records", stats.accepted, stats.total);
    crate::metrics::pipeline::batch_processed(
        &cleaner.component(),
        stats.accepted,
        stats.rejected,
        stats.failed,
    );

    BatchOutcome {
        records: accepted,
        stats,
    }
}

/// Clean a batch, returning only the accepted records in input order
pub fn clean_batch<C: Cleaner + ?Sized>(cleaner: &C, records: Vec<Record>) -> Vec<Record> {
    run_batch(cleaner, records).records
}
