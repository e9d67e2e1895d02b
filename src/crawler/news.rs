use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::source::{HttpJsonSource, RecordSource};
use super::Crawler;
use crate::config::CrawlerConfig;
use crate::constants::NEWS_CRAWLER;
use crate::error::Result;
use crate::types::{FetchParams, Record};

/// Upper bound on news items per fetch when the caller sets none
pub const DEFAULT_NEWS_LIMIT: usize = 100;

/// Financial news and flash updates (CLS, Eastmoney and similar feeds)
pub struct NewsCrawler {
    source: Arc<dyn RecordSource>,
}

impl NewsCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Crawler reading a news feed endpoint with the CLS API key as its
    /// bearer token
    pub fn from_http(base_url: &str, path: &str, config: &CrawlerConfig) -> Result<Self> {
        let source = HttpJsonSource::new(base_url, path)?
            .with_bearer_token(config.cls_api_key.clone().filter(|k| !k.is_empty()));
        Ok(Self::new(Arc::new(source)))
    }
}

#[async_trait]
impl Crawler for NewsCrawler {
    fn name(&self) -> &str {
        NEWS_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        let mut params = params.clone();
        params.limit.get_or_insert(DEFAULT_NEWS_LIMIT);
        info!(
            "Fetching news from source: {:?} via {}",
            params.source,
            self.source.describe()
        );
        self.source.fetch(&params).await
    }

    fn validate(&self, record: &Record) -> bool {
        ["title", "content", "publish_time"]
            .iter()
            .all(|field| record.contains_key(*field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::source::fake_upstream;
    use crate::crawler::{crawl, StaticSource};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_news_crawler_requires_core_fields() {
        let source = StaticSource::from_value(json!([
            {"id": "n1", "title": "快讯", "content": "正文", "publish_time": "2024-01-15 09:30:00"},
            {"id": "n2", "title": "无正文", "publish_time": "2024-01-15 09:31:00"}
        ]))
        .unwrap();
        let crawler = NewsCrawler::new(Arc::new(source));
        let out = crawl(&crawler, &FetchParams::new().with_source("cls")).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], json!("n1"));
    }

    #[tokio::test]
    async fn test_news_crawler_applies_default_limit() {
        let items: Vec<Value> = (0..150)
            .map(|i| json!({"title": i, "content": "c", "publish_time": "2024-01-15"}))
            .collect();
        let source = StaticSource::from_value(Value::Array(items)).unwrap();
        let crawler = NewsCrawler::new(Arc::new(source));

        let capped = crawl(&crawler, &FetchParams::default()).await.unwrap();
        assert_eq!(capped.len(), DEFAULT_NEWS_LIMIT);
        let explicit = crawl(&crawler, &FetchParams::new().with_limit(120)).await.unwrap();
        assert_eq!(explicit.len(), 120);
    }

    #[tokio::test]
    async fn test_http_news_crawler_sends_cls_key_and_default_limit() {
        let (base_url, request) = fake_upstream::serve_json_once(
            r#"{"data": [{"title": "快讯", "content": "正文", "publish_time": "2024-01-15 09:30:00"}]}"#,
        )
        .await;
        let config = CrawlerConfig {
            cls_api_key: Some("cls-key".to_string()),
            ..CrawlerConfig::default()
        };
        let crawler = NewsCrawler::from_http(&base_url, "/v1/telegraph", &config).unwrap();

        let out = crawl(&crawler, &FetchParams::default()).await.unwrap();
        assert_eq!(out.len(), 1);

        let request = request.await.unwrap().to_lowercase();
        assert!(request.contains("limit=100"));
        assert!(request.contains("authorization: bearer cls-key"));
    }
}
