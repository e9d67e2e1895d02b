//! Name-based construction of cleaners and crawlers, for the CLI and task bodies.

use std::sync::Arc;

use crate::cleaner::{
    Cleaner, ContentCleaner, FactorDataCleaner, MarketDataCleaner, NewsCleaner, UserDataCleaner,
};
use crate::config::{AppConfig, CrawlerConfig};
use crate::constants::*;
use crate::crawler::{
    Crawler, ExternalUserCrawler, FactorCrawler, MarketDataCrawler, NewsCrawler,
    PromptTemplateCrawler, QuantMarketCrawler, RecordSource, VectorCrawler, WeChatUserCrawler,
};
use crate::error::{PipelineError, Result};

/// Build the cleaner registered under `kind`
pub fn build_cleaner(kind: &str, config: &AppConfig) -> Result<Box<dyn Cleaner>> {
    let cleaner: Box<dyn Cleaner> = match kind {
        MARKET_CLEANER => Box::new(MarketDataCleaner::collection()),
        MARKET_QUANT_CLEANER => Box::new(MarketDataCleaner::quant()),
        NEWS_CLEANER => Box::new(NewsCleaner::new()),
        CONTENT_CLEANER => Box::new(ContentCleaner::new(config.cleaner.clone())),
        FACTOR_CLEANER => Box::new(FactorDataCleaner::new()),
        USER_CLEANER => Box::new(UserDataCleaner::new(config.password.clone())),
        other => {
            return Err(PipelineError::UnknownComponent(format!(
                "cleaner '{}' (supported: {})",
                other,
                get_supported_cleaners().join(", ")
            )))
        }
    };
    Ok(cleaner)
}

/// Build the crawler registered under `name`, reading from `source`
pub fn build_crawler(
    name: &str,
    source: Arc<dyn RecordSource>,
    config: &CrawlerConfig,
) -> Result<Box<dyn Crawler>> {
    let crawler: Box<dyn Crawler> = match name {
        MARKET_CRAWLER => Box::new(MarketDataCrawler::new(source)),
        MARKET_QUANT_CRAWLER => Box::new(QuantMarketCrawler::new(source)),
        NEWS_CRAWLER => Box::new(NewsCrawler::new(source)),
        FACTOR_CRAWLER => Box::new(FactorCrawler::new(source)),
        PROMPT_CRAWLER => Box::new(PromptTemplateCrawler::new(source)),
        VECTOR_CRAWLER => Box::new(VectorCrawler::new(source)),
        WECHAT_CRAWLER => Box::new(WeChatUserCrawler::new(source, config)),
        EXTERNAL_USER_CRAWLER => Box::new(ExternalUserCrawler::new(source)),
        other => {
            return Err(PipelineError::UnknownComponent(format!(
                "crawler '{}' (supported: {})",
                other,
                get_supported_crawlers().join(", ")
            )))
        }
    };
    Ok(crawler)
}
