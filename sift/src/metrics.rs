//! Facade metrics
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding application.

use crate::ErrorKind;
use std::time::Duration;

/// Record one engine round-trip
pub fn record_request(operation: &'static str, duration: Duration) {
    metrics::counter!("sift_search_requests_total", "operation" => operation).increment(1);
    metrics::histogram!("sift_search_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record a failed call, by error classification
pub fn record_failure(kind: ErrorKind) {
    metrics::counter!("sift_search_failures_total", "kind" => kind.as_str()).increment(1);
}

/// Record a dry run that skipped the engine
pub fn record_dry_run(operation: &'static str) {
    metrics::counter!("sift_dry_runs_total", "operation" => operation).increment(1);
}
