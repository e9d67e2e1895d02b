use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Where and how verbosely to log
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Default level for this crate when `RUST_LOG` is unset
    pub level: String,
    /// Directory for the daily rolling JSON log; console only when `None`
    pub log_dir: Option<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: Some("logs".to_string()),
        }
    }
}

/// Initializes the logging system with console output and, when a log
/// directory is configured, a JSON file layer. The returned guard must be
/// held until exit so buffered file logs are flushed.
pub fn init_logging(options: &LoggingOptions) -> Option<WorkerGuard> {
    let directive = format!("quantbull_pipeline={}", options.level);
    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };

    match &options.log_dir {
        Some(dir) => {
            // Ensure logs directory exists
            let _ = fs::create_dir_all(dir);

            let file_appender = tracing_appender::rolling::daily(dir, "pipeline.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_only_logging_has_no_guard() {
        let options = LoggingOptions {
            level: "debug".to_string(),
            log_dir: None,
        };
        assert!(init_logging(&options).is_none());
    }

    #[test]
    fn test_file_logging_creates_directory_and_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let options = LoggingOptions {
            level: "info".to_string(),
            log_dir: Some(log_dir.to_string_lossy().into_owned()),
        };
        let guard = init_logging(&options);
        assert!(guard.is_some());
        assert!(log_dir.is_dir());
    }
}
