//! Task bodies invoked by a scheduler or the CLI: crawl, clean, or both,
//! summarized in a [`TaskReport`]. Failures are reported, never raised.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::cleaner::{run_batch, Cleaner};
use crate::crawler::{crawl, Crawler};
use crate::types::{FetchParams, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Error,
}

/// Outcome of one task run
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub status: TaskStatus,
    pub task: String,
    pub timestamp: DateTime<Utc>,
    pub records_collected: usize,
    pub records_cleaned: usize,
    pub records_rejected: usize,
    pub records_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Records that made it through the task; not part of the serialized report
    #[serde(skip)]
    pub records: Vec<Record>,
}

impl TaskReport {
    fn new(task: &str) -> Self {
        Self {
            status: TaskStatus::Success,
            task: task.to_string(),
            timestamp: Utc::now(),
            records_collected: 0,
            records_cleaned: 0,
            records_rejected: 0,
            records_failed: 0,
            error: None,
            records: Vec::new(),
        }
    }

    fn failed(task: &str, message: String) -> Self {
        Self {
            status: TaskStatus::Error,
            error: Some(message),
            ..Self::new(task)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    fn apply_clean(mut self, cleaner: &dyn Cleaner, records: Vec<Record>) -> Self {
        let outcome = run_batch(cleaner, records);
        self.records_cleaned = outcome.stats.accepted;
        self.records_rejected = outcome.stats.rejected;
        self.records_failed = outcome.stats.failed;
        self.records = outcome.records;
        self
    }
}

/// Crawl only
#[instrument(skip(crawler, params), fields(crawler = %crawler.component()))]
pub async fn collect(task: &str, crawler: &dyn Crawler, params: &FetchParams) -> TaskReport {
    match crawl(crawler, params).await {
        Ok(records) => {
            let mut report = TaskReport::new(task);
            report.records_collected = records.len();
            report.records = records;
            info!("Completed {}: {} records collected", task, report.records_collected);
            report
        }
        Err(e) => {
            error!("Error in {}: {}", task, e);
            TaskReport::failed(task, e.to_string())
        }
    }
}

/// Crawl, then clean what was collected
#[instrument(skip(crawler, cleaner, params), fields(crawler = %crawler.component(), cleaner = %cleaner.component()))]
pub async fn collect_and_clean(
    task: &str,
    crawler: &dyn Crawler,
    cleaner: &dyn Cleaner,
    params: &FetchParams,
) -> TaskReport {
    let collected = match crawl(crawler, params).await {
        Ok(records) => records,
        Err(e) => {
            error!("Error in {}: {}", task, e);
            return TaskReport::failed(task, e.to_string());
        }
    };

    let mut report = TaskReport::new(task);
    report.records_collected = collected.len();
    let report = report.apply_clean(cleaner, collected);
    info!(
        "Completed {}: {} collected, {} cleaned",
        task, report.records_collected, report.records_cleaned
    );
    report
}

/// Clean records that are already in hand
#[instrument(skip(cleaner, records), fields(cleaner = %cleaner.component(), total = records.len()))]
pub fn clean_records(task: &str, cleaner: &dyn Cleaner, records: Vec<Record>) -> TaskReport {
    let mut report = TaskReport::new(task);
    report.records_collected = records.len();
    report.apply_clean(cleaner, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::MarketDataCleaner;
    use crate::crawler::{MarketDataCrawler, RecordSource, StaticSource};
    use crate::error::{PipelineError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct DownSource;

    #[async_trait]
    impl RecordSource for DownSource {
        fn describe(&self) -> String {
            "down".to_string()
        }

        async fn fetch(&self, _params: &FetchParams) -> Result<Vec<Record>> {
            Err(PipelineError::fetch("down", "503 Service Unavailable"))
        }
    }

    fn quotes() -> Arc<dyn RecordSource> {
        Arc::new(
            StaticSource::from_value(json!([
                {"ts_code": "600519.sh", "trade_date": "20240115", "close": "1680.5"},
                {"ts_code": "000001.sz", "trade_date": "20240115", "close": "0"},
                {"trade_date": "20240115", "close": 1.0}
            ]))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_collect_and_clean_counts_each_stage() {
        let crawler = MarketDataCrawler::new(quotes());
        let report = collect_and_clean(
            "collect_kline_data",
            &crawler,
            &MarketDataCleaner::collection(),
            &FetchParams::default(),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.records_collected, 2);
        assert_eq!(report.records_cleaned, 1);
        assert_eq!(report.records_rejected, 1);
        assert_eq!(report.records[0]["code"], json!("600519.SH"));
        assert_eq!(report.records[0]["date"], json!("2024-01-15"));
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_error_report() {
        let crawler = MarketDataCrawler::new(Arc::new(DownSource));
        let report = collect_and_clean(
            "collect_kline_data",
            &crawler,
            &MarketDataCleaner::collection(),
            &FetchParams::default(),
        )
        .await;

        assert_eq!(report.status, TaskStatus::Error);
        assert!(report.error.as_deref().unwrap().contains("503"));
        assert_eq!(report.records_collected, 0);

        let crawl_only = collect("collect_realtime_quotes", &crawler, &FetchParams::default()).await;
        assert!(!crawl_only.is_success());
    }

    #[test]
    fn test_report_serializes_without_records() {
        let report = clean_records(
            "clean_market",
            &MarketDataCleaner::quant(),
            vec![json!({"code": "a", "date": "20240101", "close": 1})
                .as_object()
                .cloned()
                .unwrap()],
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["records_cleaned"], json!(1));
        assert!(value.get("records").is_none());
        assert!(value.get("error").is_none());
    }
}
