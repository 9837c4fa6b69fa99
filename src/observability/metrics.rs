//! Prometheus metrics for the file pipeline
//!
//! Recording goes through the `metrics` facade, so calls are no-ops until
//! [`init_metrics`] installs the Prometheus recorder.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Source metrics
    ListRequestsSuccess,
    ListRequestsError,
    FileFetchSuccess,
    FileFetchError,

    // Validator metrics
    RowsAccepted,
    RowsRejected,

    // Aggregation metrics
    FilesAggregated,
    AggregateDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ListRequestsSuccess => "csv_files_list_requests_success_total",
            MetricName::ListRequestsError => "csv_files_list_requests_error_total",
            MetricName::FileFetchSuccess => "csv_files_file_fetch_success_total",
            MetricName::FileFetchError => "csv_files_file_fetch_error_total",
            MetricName::RowsAccepted => "csv_files_rows_accepted_total",
            MetricName::RowsRejected => "csv_files_rows_rejected_total",
            MetricName::FilesAggregated => "csv_files_files_aggregated_total",
            MetricName::AggregateDuration => "csv_files_aggregate_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            ListRequestsSuccess,
            ListRequestsError,
            FileFetchSuccess,
            FileFetchError,
            RowsAccepted,
            RowsRejected,
            FilesAggregated,
            AggregateDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Install the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already stored");
            }
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Text exposition of every recorded metric, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

pub mod source {
    use super::MetricName;

    pub fn list_success() {
        ::metrics::counter!(MetricName::ListRequestsSuccess.as_str()).increment(1);
    }

    pub fn list_error() {
        ::metrics::counter!(MetricName::ListRequestsError.as_str()).increment(1);
    }

    pub fn file_success() {
        ::metrics::counter!(MetricName::FileFetchSuccess.as_str()).increment(1);
    }

    pub fn file_error() {
        ::metrics::counter!(MetricName::FileFetchError.as_str()).increment(1);
    }
}

pub mod validator {
    use super::MetricName;

    pub fn rows_validated(accepted: usize, rejected: usize) {
        ::metrics::counter!(MetricName::RowsAccepted.as_str()).increment(accepted as u64);
        ::metrics::counter!(MetricName::RowsRejected.as_str()).increment(rejected as u64);
    }
}

pub mod aggregate {
    use super::MetricName;

    pub fn completed(files: usize, secs: f64) {
        ::metrics::counter!(MetricName::FilesAggregated.as_str()).increment(files as u64);
        ::metrics::histogram!(MetricName::AggregateDuration.as_str()).record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("csv_files_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        source::file_error();
        validator::rows_validated(3, 1);
        aggregate::completed(2, 0.01);
    }
}
