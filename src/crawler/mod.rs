//! Fetch → preprocess → validate → postprocess pipelines over external sources.
//!
//! A [`Crawler`] owns the per-source field rules; the raw I/O is delegated to
//! an injected [`RecordSource`]. [`crawl`] is the driver: a fetch failure is
//! returned to the caller, a bad record is only skipped.

pub mod factor;
pub mod market;
pub mod news;
pub mod prompt;
pub mod source;
pub mod user;
pub mod vector;

pub use factor::FactorCrawler;
pub use market::{MarketDataCrawler, QuantMarketCrawler};
pub use news::NewsCrawler;
pub use prompt::PromptTemplateCrawler;
pub use source::{HttpJsonSource, JsonFileSource, RecordSource, StaticSource};
pub use user::{ExternalUserCrawler, WeChatUserCrawler};
pub use vector::VectorCrawler;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::types::{FetchParams, Record, RecordExt};

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Short component name, e.g. `market` or `wechat`
    fn name(&self) -> &str;

    /// Pull raw records from the upstream source. This is the only
    /// suspension point of a crawl.
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>>;

    /// Structural check on a preprocessed record
    fn validate(&self, record: &Record) -> bool;

    /// Field renaming and coercion ahead of validation
    fn preprocess(&self, record: Record) -> Result<Record> {
        Ok(record)
    }

    /// Enrichment of a validated record
    fn postprocess(&self, record: Record) -> Result<Record> {
        Ok(record)
    }

    fn component(&self) -> String {
        format!("crawler.{}", self.name())
    }
}

/// Fetch from the crawler's source and keep the records that survive
/// preprocessing, validation and postprocessing, in fetch order.
#[instrument(skip_all, fields(component = %crawler.component()))]
pub async fn crawl<C: Crawler + ?Sized>(crawler: &C, params: &FetchParams) -> Result<Vec<Record>> {
    info!("Starting crawl with params: {:?}", params);

    let raw = match crawler.fetch(params).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Crawl failed: {}", e);
            crate::metrics::crawl::fetch_failed(&crawler.component());
            return Err(e);
        }
    };
    crate::metrics::crawl::records_fetched(&crawler.component(), raw.len());

    let mut processed = Vec::with_capacity(raw.len());
    for record in raw {
        let id = record.record_id();
        let record = match crawler.preprocess(record) {
            Ok(record) => record,
            Err(e) => {
                error!("Error preprocessing record {}: {}", id, e);
                continue;
            }
        };
        if !crawler.validate(&record) {
            warn!("Invalid record: {}", id);
            continue;
        }
        match crawler.postprocess(record) {
            Ok(record) => processed.push(record),
            Err(e) => error!("Error postprocessing record {}: {}", id, e),
        }
    }

    info!("Processed {} valid records", processed.len());
    Ok(processed)
}
