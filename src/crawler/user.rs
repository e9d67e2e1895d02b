use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::source::{HttpJsonSource, RecordSource};
use super::Crawler;
use crate::config::CrawlerConfig;
use crate::constants::{EXTERNAL_USER_CRAWLER, WECHAT_CRAWLER};
use crate::error::{PipelineError, Result};
use crate::types::{scalar_text, FetchParams, Record, RecordExt};

/// WeChat API keys that map to a different internal name
const WECHAT_FIELD_MAP: [(&str, &str); 1] = [("headimgurl", "avatar_url")];

/// WeChat mini-program users
pub struct WeChatUserCrawler {
    source: Arc<dyn RecordSource>,
    appid: Option<String>,
}

impl WeChatUserCrawler {
    pub fn new(source: Arc<dyn RecordSource>, config: &CrawlerConfig) -> Self {
        Self {
            source,
            appid: config.wechat_appid.clone(),
        }
    }
}

#[async_trait]
impl Crawler for WeChatUserCrawler {
    fn name(&self) -> &str {
        WECHAT_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching user data from WeChat (appid: {})",
            self.appid.as_deref().unwrap_or("unset")
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        record.contains_key("openid")
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        for (wechat_key, internal_key) in WECHAT_FIELD_MAP {
            if let Some(value) = record.remove(wechat_key) {
                record.insert(internal_key.to_string(), value);
            }
        }
        Ok(record)
    }
}

/// Users synced from a third-party account system
pub struct ExternalUserCrawler {
    source: Arc<dyn RecordSource>,
}

impl ExternalUserCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Crawler reading `api_endpoint` with `api_key` as its bearer token
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let endpoint = config
            .api_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Config("api_endpoint is required for external user sync".to_string())
            })?;
        let source = HttpJsonSource::new(endpoint, "")?
            .with_bearer_token(config.api_key.clone().filter(|k| !k.is_empty()));
        Ok(Self::new(Arc::new(source)))
    }

    fn rewrite(record: &mut Record, field: &str, f: impl FnOnce(&str) -> String) -> Result<()> {
        if !record.is_truthy(field) {
            return Ok(());
        }
        let text = match record.get(field) {
            Some(value) => scalar_text(field, value)?,
            None => None,
        };
        if let Some(text) = text {
            record.insert(field.to_string(), Value::String(f(&text)));
        }
        Ok(())
    }
}

#[async_trait]
impl Crawler for ExternalUserCrawler {
    fn name(&self) -> &str {
        EXTERNAL_USER_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching user data from external source: {:?} via {}",
            params.source,
            self.source.describe()
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        if !["id", "email", "username"]
            .iter()
            .any(|field| record.contains_key(*field))
        {
            return false;
        }
        if record.is_truthy("email") {
            let email = match record.get("email") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return false,
            };
            // only the segment between the first and any second '@' counts
            let domain_ok = email
                .split('@')
                .nth(1)
                .map_or(false, |domain| domain.contains('.'));
            if !domain_ok {
                return false;
            }
        }
        true
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        Self::rewrite(&mut record, "email", |s| s.trim().to_lowercase())?;
        Self::rewrite(&mut record, "username", |s| s.trim().to_string())?;
        Ok(record)
    }
}
