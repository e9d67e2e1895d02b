use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::source::RecordSource;
use super::Crawler;
use crate::constants::FACTOR_CRAWLER;
use crate::error::Result;
use crate::types::{coerce_f64, f64_to_value, FetchParams, Record};

/// Pre-computed or externally sourced quantitative factors
pub struct FactorCrawler {
    source: Arc<dyn RecordSource>,
}

impl FactorCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Crawler for FactorCrawler {
    fn name(&self) -> &str {
        FACTOR_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching factor data: codes={:?}, factors={:?}, start={:?}, end={:?}",
            params.codes, params.factor_names, params.start_date, params.end_date
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        ["code", "date", "factor_name", "factor_value"]
            .iter()
            .all(|field| record.contains_key(*field))
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        if let Some(value) = record.get_mut("factor_value") {
            *value = f64_to_value(coerce_f64(value));
        }
        Ok(record)
    }
}
