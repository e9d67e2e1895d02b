//! Pipeline counters, recorded through the `metrics` facade.
//!
//! Nothing is exported unless a recorder is installed (see [`install_prometheus`]).

use std::fmt;
use std::net::SocketAddr;

/// All metric names emitted by the pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RecordsAccepted,
    RecordsRejected,
    RecordsFailed,
    BatchesProcessed,
    CrawlFetchErrors,
    CrawlRecordsFetched,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RecordsAccepted => "qb_records_accepted_total",
            MetricName::RecordsRejected => "qb_records_rejected_total",
            MetricName::RecordsFailed => "qb_records_failed_total",
            MetricName::BatchesProcessed => "qb_batches_processed_total",
            MetricName::CrawlFetchErrors => "qb_crawl_fetch_errors_total",
            MetricName::CrawlRecordsFetched => "qb_crawl_records_fetched_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn increment(name: MetricName, component: &str, by: u64) {
    if by == 0 {
        return;
    }
    ::metrics::counter!(name.as_str(), "component" => component.to_string()).increment(by);
}

pub mod pipeline {
    use super::{increment, MetricName};

    /// Record the outcome counts of one batch run
    pub fn batch_processed(component: &str, accepted: usize, rejected: usize, failed: usize) {
        increment(MetricName::BatchesProcessed, component, 1);
        increment(MetricName::RecordsAccepted, component, accepted as u64);
        increment(MetricName::RecordsRejected, component, rejected as u64);
        increment(MetricName::RecordsFailed, component, failed as u64);
    }
}

pub mod crawl {
    use super::{increment, MetricName};

    pub fn fetch_failed(component: &str) {
        increment(MetricName::CrawlFetchErrors, component, 1);
    }

    pub fn records_fetched(component: &str, count: usize) {
        increment(MetricName::CrawlRecordsFetched, component, count as u64);
    }
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
/// Must be called from within a tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> crate::error::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| crate::error::PipelineError::Config(format!("metrics exporter: {e}")))
}
