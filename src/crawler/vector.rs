use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::source::RecordSource;
use super::Crawler;
use crate::constants::VECTOR_CRAWLER;
use crate::error::Result;
use crate::types::{FetchParams, Record};

/// Embedding vectors exported from a vector store collection
pub struct VectorCrawler {
    source: Arc<dyn RecordSource>,
}

impl VectorCrawler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Crawler for VectorCrawler {
    fn name(&self) -> &str {
        VECTOR_CRAWLER
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        info!(
            "Fetching vector data from collection: {:?}, limit: {:?}",
            params.collection, params.limit
        );
        self.source.fetch(params).await
    }

    fn validate(&self, record: &Record) -> bool {
        let vector = match (record.get("vector"), record.get("embedding")) {
            (None, None) => return false,
            (Some(v), _) | (None, Some(v)) => v,
        };
        matches!(vector, Value::Null | Value::Array(_))
    }

    fn preprocess(&self, mut record: Record) -> Result<Record> {
        if !record.contains_key("vector") {
            if let Some(embedding) = record.remove("embedding") {
                record.insert("vector".to_string(), embedding);
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{crawl, StaticSource};
    use serde_json::json;

    #[tokio::test]
    async fn test_embedding_renamed_and_shape_checked() {
        let source = StaticSource::from_value(json!([
            {"id": "a", "embedding": [0.1, 0.2]},
            {"id": "b", "vector": [0.3], "embedding": "kept"},
            {"id": "c", "vector": "0.1,0.2"},
            {"id": "d", "text": "no vector"},
            {"id": "e", "vector": null}
        ]))
        .unwrap();
        let out = crawl(&VectorCrawler::new(Arc::new(source)), &FetchParams::default())
            .await
            .unwrap();

        let ids: Vec<_> = out.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b"), json!("e")]);
        assert_eq!(out[0]["vector"], json!([0.1, 0.2]));
        assert!(!out[0].contains_key("embedding"));
        assert_eq!(out[1]["embedding"], json!("kept"));
    }
}
