use crate::constants::{
    DEFAULT_DATA_SERVICE_URL, DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MIN_CONTENT_LENGTH,
};
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration, read from `config.toml`. Every section is
/// optional and unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub cleaner: CleanerConfig,
    pub crawler: CrawlerConfig,
    pub password: PasswordPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "quantbull-pipeline".to_string(),
            log_level: "info".to_string(),
            log_dir: None,
            cleaner: CleanerConfig::default(),
            crawler: CrawlerConfig::default(),
            password: PasswordPolicy::default(),
        }
    }
}

/// Options read by cleaner instances at construction time
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanerConfig {
    pub min_content_length: usize,
    pub max_content_length: usize,
    pub remove_code_blocks: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            remove_code_blocks: false,
        }
    }
}

/// Credentials and endpoints for the crawlers' upstream sources
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    pub tushare_token: Option<String>,
    pub data_service_url: String,
    pub cls_api_key: Option<String>,
    pub wechat_appid: Option<String>,
    pub wechat_secret: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            tushare_token: None,
            data_service_url: DEFAULT_DATA_SERVICE_URL.to_string(),
            cls_api_key: None,
            wechat_appid: None,
            wechat_secret: None,
            api_endpoint: None,
            api_key: None,
        }
    }
}

/// Password requirements checked by the user cleaner
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Config file '{}' not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Apply `.env` and `QB_*` environment overrides on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        let _ = dotenv::dotenv();
        if let Ok(token) = std::env::var("QB_TUSHARE_TOKEN") {
            if !token.trim().is_empty() {
                self.crawler.tushare_token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("QB_DATA_SERVICE_URL") {
            if !url.trim().is_empty() {
                self.crawler.data_service_url = url;
            }
        }
        if let Ok(level) = std::env::var("QB_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log_level = level;
            }
        }
        self
    }

    fn check(&self) -> Result<()> {
        if self.cleaner.max_content_length < self.cleaner.min_content_length {
            return Err(PipelineError::Config(format!(
                "max_content_length ({}) is below min_content_length ({})",
                self.cleaner.max_content_length, self.cleaner.min_content_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_absent() {
        let config = AppConfig::from_toml_str("service_name = \"data-service\"").unwrap();
        assert_eq!(config.service_name, "data-service");
        assert_eq!(config.cleaner, CleanerConfig::default());
        assert_eq!(config.crawler.data_service_url, DEFAULT_DATA_SERVICE_URL);
        assert_eq!(config.password.min_length, 8);
    }

    #[test]
    fn test_unknown_options_are_ignored() {
        let toml = r#"
            [cleaner]
            min_content_length = 10
            remove_code_blocks = true
            something_else = 3

            [crawler]
            tushare_token = "abc"
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.cleaner.min_content_length, 10);
        assert_eq!(config.cleaner.max_content_length, DEFAULT_MAX_CONTENT_LENGTH);
        assert!(config.cleaner.remove_code_blocks);
        assert_eq!(config.crawler.tushare_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_inverted_length_bounds_are_rejected() {
        let toml = "[cleaner]\nmin_content_length = 100\nmax_content_length = 10\n";
        let result = AppConfig::from_toml_str(toml);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");

        let missing = AppConfig::load(dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing.log_level, "info");
    }
}
