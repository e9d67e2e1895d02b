use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::source::RecordSource;
use super::Crawler;
use crate::constants::PROMPT_CRAWLER;
use crate::error::Result;
use crate::types::{FetchParams, Record};

/// Prompt templates synced from a database, file tree or remote API
pub struct PromptTemplateCrawler {
    source: Arc<dyn RecordSource>,
}

impl PromptTemplateCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

/// Split `"a, b,,c"` into `["a", "b", "c"]`
fn split_variables(text: &str) -> Vec<Value> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Value::String(name.to_string()))
        .collect()
}

#[async_trait]
impl Crawler for PromptTemplateCrawler {
    fn name(&self) -> &str {
        PROMPT_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching prompt templates from source: {:?}, category: {:?}",
            params.source, params.category
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        record.contains_key("name") && record.contains_key("template")
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        let variables = match record.get("variables") {
            Some(Value::String(text)) => Some(split_variables(text)),
            _ => None,
        };
        if let Some(variables) = variables {
            record.insert("variables".to_string(), Value::Array(variables));
        }
        Ok(record)
    }
}
