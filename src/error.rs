use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed for {source_name}: {message}")]
    Fetch { source_name: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed record field '{field}': {reason}")]
    MalformedRecord { field: String, reason: String },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),
}

impl PipelineError {
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from the upstream source rather than a single record.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Http(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
