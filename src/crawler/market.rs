use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::source::{HttpJsonSource, RecordSource};
use super::Crawler;
use crate::cleaner::market::NUMERIC_FIELDS;
use crate::config::CrawlerConfig;
use crate::constants::{MARKET_CRAWLER, MARKET_QUANT_CRAWLER};
use crate::error::Result;
use crate::types::{coerce_f64, f64_to_value, is_truthy, FetchParams, Record};

/// K-line endpoint exposed by the data service
pub const KLINE_PATH: &str = "/api/v1/market/kline";

const DEFAULT_PERIOD: &str = "1d";

fn rename(record: &mut Record, from: &str, to: &str) {
    if let Some(value) = record.remove(from) {
        record.insert(to.to_string(), value);
    }
}

/// Daily quotes as delivered by Tushare-style upstreams (data collection service)
pub struct MarketDataCrawler {
    source: Arc<dyn RecordSource>,
}

impl MarketDataCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Crawler reading a quote endpoint, authenticated with the configured
    /// Tushare token when one is set
    pub fn from_http(base_url: &str, path: &str, config: &CrawlerConfig) -> Result<Self> {
        let source = HttpJsonSource::new(base_url, path)?
            .with_bearer_token(config.tushare_token.clone().filter(|t| !t.is_empty()));
        Ok(Self::new(Arc::new(source)))
    }
}

#[async_trait]
impl Crawler for MarketDataCrawler {
    fn name(&self) -> &str {
        MARKET_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching market data for codes: {:?} from {}",
            params.codes,
            self.source.describe()
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        ["code", "date", "close"]
            .iter()
            .all(|field| record.contains_key(*field))
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        rename(&mut record, "ts_code", "code");
        rename(&mut record, "trade_date", "date");
        Ok(record)
    }
}

/// K-line bars pulled from the data service for the quant engine
pub struct QuantMarketCrawler {
    source: Arc<dyn RecordSource>,
}

impl QuantMarketCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Crawler reading the data service's K-line endpoint
    pub fn from_data_service(config: &CrawlerConfig) -> Result<Self> {
        let source = HttpJsonSource::new(&config.data_service_url, KLINE_PATH)?;
        Ok(Self::new(Arc::new(source)))
    }
}

#[async_trait]
impl Crawler for QuantMarketCrawler {
    fn name(&self) -> &str {
        MARKET_QUANT_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        let mut params = params.clone();
        if params.period.is_none() {
            params.period = Some(DEFAULT_PERIOD.to_string());
        }
        info!(
            "Fetching market data: codes={:?}, start={:?}, end={:?}, period={:?}",
            params.codes, params.start_date, params.end_date, params.period
        );
        self.source.fetch(&params).await
    }

    fn validate(&self, record: &Record) -> bool {
        ["code", "date", "open", "high", "low", "close", "volume"]
            .iter()
            .all(|field| record.contains_key(*field))
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        for field in NUMERIC_FIELDS {
            if let Some(value) = record.get_mut(field) {
                *value = if is_truthy(value) {
                    f64_to_value(coerce_f64(value))
                } else {
                    Value::Null
                };
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::source::fake_upstream;
    use crate::crawler::{crawl, StaticSource};
    use serde_json::json;

    fn source(payload: Value) -> Arc<dyn RecordSource> {
        Arc::new(StaticSource::from_value(payload).unwrap())
    }

    #[tokio::test]
    async fn test_collection_crawler_renames_tushare_fields() {
        let crawler = MarketDataCrawler::new(
            source(json!([
                {"ts_code": "600519.SH", "trade_date": "20240115", "close": 1680.0, "vol": 100},
                {"ts_code": "000001.SZ", "close": 9.1}
            ])),
        );
        let out = crawl(&crawler, &FetchParams::default()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["code"], json!("600519.SH"));
        assert_eq!(out[0]["date"], json!("20240115"));
        assert_eq!(out[0]["vol"], json!(100));
        assert!(!out[0].contains_key("ts_code"));
    }

    #[tokio::test]
    async fn test_collection_crawler_sends_tushare_token() {
        let (base_url, request) = fake_upstream::serve_json_once(
            r#"[{"ts_code": "600519.SH", "trade_date": "20240115", "close": 1680.0}]"#,
        )
        .await;
        let config = CrawlerConfig {
            tushare_token: Some("tushare-token".to_string()),
            ..CrawlerConfig::default()
        };
        let crawler = MarketDataCrawler::from_http(&base_url, "/daily", &config).unwrap();

        let out = crawl(&crawler, &FetchParams::new().with_codes(["600519.SH"]))
            .await
            .unwrap();
        assert_eq!(out[0]["code"], json!("600519.SH"));

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /daily?"));
        assert!(request.contains("authorization: bearer tushare-token"));
    }

    #[tokio::test]
    async fn test_quant_crawler_coerces_and_requires_bar_fields() {
        let crawler = QuantMarketCrawler::new(source(json!([
            {"code": "600000", "date": "2024-01-02", "open": "10", "high": "10.5",
             "low": 0, "close": "abc", "volume": "1200", "amount": ""},
            {"code": "600001", "date": "2024-01-02", "open": 1, "close": 1}
        ])));
        let out = crawl(&crawler, &FetchParams::default()).await.unwrap();
        assert_eq!(out.len(), 1);
        let bar = &out[0];
        assert_eq!(bar["open"], json!(10.0));
        assert_eq!(bar["high"], json!(10.5));
        assert_eq!(bar["low"], Value::Null);
        assert_eq!(bar["close"], Value::Null);
        assert_eq!(bar["volume"], json!(1200.0));
        assert_eq!(bar["amount"], Value::Null);
    }

    #[test]
    fn test_quant_crawler_from_data_service() {
        let crawler = QuantMarketCrawler::from_data_service(&CrawlerConfig::default()).unwrap();
        assert_eq!(crawler.component(), "crawler.market-quant");
    }
}
