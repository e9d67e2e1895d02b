//! Fetch ports wrapped by the crawler variants.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{PipelineError, Result};
use crate::types::{FetchParams, Record};

/// Where a crawler's raw records come from
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable name used in fetch errors
    fn describe(&self) -> String;

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>>;
}

/// Turn a decoded payload into records. Accepts a JSON array of objects or
/// an object wrapping one under `data`.
pub fn records_from_payload(source: &str, payload: Value) -> Result<Vec<Record>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PipelineError::fetch(
                    source,
                    "expected an array or an object with a 'data' array",
                ))
            }
        },
        other => {
            return Err(PipelineError::fetch(
                source,
                format!("expected an array of records, found {}", json_kind(&other)),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(PipelineError::fetch(
                source,
                format!("item {} is {}, not an object", idx, json_kind(&other)),
            )),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn apply_limit(mut records: Vec<Record>, params: &FetchParams) -> Vec<Record> {
    if let Some(limit) = params.limit {
        records.truncate(limit);
    }
    records
}

/// Fixed in-memory records, for replay and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Build from a JSON payload with the same shapes a remote source accepts
    pub fn from_value(payload: Value) -> Result<Self> {
        Ok(Self::new(records_from_payload("static", payload)?))
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    fn describe(&self) -> String {
        "static".to_string()
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        Ok(apply_limit(self.records.clone(), params))
    }
}

/// Records read from a JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    #[instrument(skip(self, params), fields(path = %self.path.display()))]
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PipelineError::fetch(self.describe(), e.to_string()))?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::fetch(self.describe(), format!("invalid JSON: {e}")))?;
        let records = records_from_payload(&self.describe(), payload)?;
        debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(apply_limit(records, params))
    }
}

/// Records fetched with an HTTP GET from a JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: reqwest::Client,
    base_url: String,
    path: String,
    bearer_token: Option<String>,
}

impl HttpJsonSource {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("quantbull-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            path: path.into(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    /// Full request URL; an empty path means the base URL is the endpoint
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[async_trait]
impl RecordSource for HttpJsonSource {
    fn describe(&self) -> String {
        self.url()
    }

    #[instrument(skip(self, params), fields(url = %self.url()))]
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Record>> {
        let mut request = self.client.get(self.url()).query(&params.to_query_pairs());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::fetch(self.describe(), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::fetch(
                self.describe(),
                format!("HTTP {}", status),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::fetch(self.describe(), format!("invalid JSON: {e}")))?;
        let records = records_from_payload(&self.describe(), payload)?;
        info!("Fetched {} records from {}", records.len(), self.url());
        Ok(apply_limit(records, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_payload_shapes() {
        let flat = records_from_payload("t", json!([{"a": 1}, {"b": 2}])).unwrap();
        assert_eq!(flat.len(), 2);

        let wrapped = records_from_payload("t", json!({"data": [{"a": 1}], "total": 1})).unwrap();
        assert_eq!(wrapped[0]["a"], json!(1));

        assert!(records_from_payload("t", json!({"items": []})).is_err());
        assert!(records_from_payload("t", json!("nope")).is_err());
        let err = records_from_payload("t", json!([{"a": 1}, 3])).unwrap_err();
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("item 1"));
    }

    #[tokio::test]
    async fn test_static_source_applies_limit() {
        let source = StaticSource::from_value(json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
        let all = source.fetch(&FetchParams::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        let two = source.fetch(&FetchParams::new().with_limit(2)).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[1]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_json_file_source_reads_wrapped_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!({"data": [{"code": "600519"}]})).unwrap();

        let records = JsonFileSource::new(file.path())
            .fetch(&FetchParams::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["code"], json!("600519"));
    }

    #[tokio::test]
    async fn test_json_file_source_errors_are_fetch_failures() {
        let missing = JsonFileSource::new("/nonexistent/quotes.json")
            .fetch(&FetchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, PipelineError::Fetch { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = JsonFileSource::new(file.path())
            .fetch(&FetchParams::default())
            .await
            .unwrap_err();
        assert!(invalid.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_http_source_url_joining() {
        let source = HttpJsonSource::new("http://data-service:8001/", "/api/v1/market").unwrap();
        assert_eq!(source.url(), "http://data-service:8001/api/v1/market");
        let bare = HttpJsonSource::new("http://users.example.com/v1/users/", "").unwrap();
        assert_eq!(bare.url(), "http://users.example.com/v1/users");
    }

    #[tokio::test]
    async fn test_http_source_sends_query_and_bearer_token() {
        let (base_url, request) = fake_upstream::serve_json_once(r#"{"data": [{"code": "600519"}]}"#).await;
        let source = HttpJsonSource::new(base_url, "/api/v1/market/kline")
            .unwrap()
            .with_bearer_token(Some("secret-token".to_string()));

        let records = source
            .fetch(&FetchParams::new().with_limit(5))
            .await
            .unwrap();
        assert_eq!(records[0]["code"], json!("600519"));

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/v1/market/kline?"));
        assert!(request.contains("limit=5"));
        assert!(request.contains("authorization: bearer secret-token"));
    }
}

/// One-shot HTTP upstream for exercising `HttpJsonSource` end to end
#[cfg(test)]
pub(crate) mod fake_upstream {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve `body` as JSON to the first connection. Returns the base URL
    /// and a handle resolving to the raw request head.
    pub async fn serve_json_once(body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}", addr), handle)
    }
}
