use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One unit of work: a flexible field mapping as produced by a source.
/// Variants read the keys they know and leave every other key untouched.
pub type Record = Map<String, Value>;

/// Typed accessors over the schema-less record
pub trait RecordExt {
    /// Key exists, regardless of its value (null included)
    fn is_present(&self, key: &str) -> bool;

    /// Key exists and holds a non-empty, non-zero, non-null value
    fn is_truthy(&self, key: &str) -> bool;

    fn str_field(&self, key: &str) -> Option<&str>;

    /// Numeric value of a field that already holds a JSON number
    fn f64_field(&self, key: &str) -> Option<f64>;

    /// Identifier used when logging skipped records
    fn record_id(&self) -> String;
}

impl RecordExt for Record {
    fn is_present(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn is_truthy(&self, key: &str) -> bool {
        self.get(key).map(is_truthy).unwrap_or(false)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn f64_field(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn record_id(&self) -> String {
        match self.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "unknown".to_string(),
        }
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Coerce a JSON value to a float. Numeric strings may carry surrounding
/// whitespace; anything else that is not a number or boolean yields `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// JSON representation of an optional float; non-finite values become null.
pub fn f64_to_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Text form of a scalar field. Null reads as `None`; arrays and objects are
/// an unexpected shape for a text field.
pub fn scalar_text(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) => Err(PipelineError::malformed(field, "expected text, found an array")),
        Value::Object(_) => Err(PipelineError::malformed(field, "expected text, found an object")),
    }
}

/// Source-specific filters passed to a crawler's fetch step
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchParams {
    pub codes: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// K-line period (1m, 5m, 15m, 30m, 1h, 1d)
    pub period: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub collection: Option<String>,
    pub factor_names: Vec<String>,
    pub limit: Option<usize>,
    /// Any other named parameter, forwarded to the source as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FetchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Flatten into query-string pairs; lists are comma-joined and unset
    /// options are omitted.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if !self.codes.is_empty() {
            pairs.push(("codes".to_string(), self.codes.join(",")));
        }
        if !self.factor_names.is_empty() {
            pairs.push(("factor_names".to_string(), self.factor_names.join(",")));
        }
        let optional = [
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("period", &self.period),
            ("source", &self.source),
            ("category", &self.category),
            ("collection", &self.collection),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                pairs.push((key.to_string(), v.clone()));
            }
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        for (key, value) in &self.extra {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.push((key.clone(), text));
        }
        pairs
    }
}
