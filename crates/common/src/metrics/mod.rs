//! Metrics and observability utilities
//!
//! Provides Prometheus metric descriptions with standardized naming and
//! histogram buckets sized for model-bound latencies.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all IntelliCourse metrics
pub const METRICS_PREFIX: &str = "intellicourse";

/// Histogram buckets for request and flow latency (in seconds)
///
/// A chat request is two model calls plus one retrieval.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    3.000, // 3s
    5.000, // 5s
    10.00, // 10s
    20.00, // 20s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Flow metrics
    describe_counter!(
        format!("{}_route_decisions_total", METRICS_PREFIX),
        Unit::Count,
        "Router decisions by route"
    );

    describe_histogram!(
        format!("{}_flow_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end flow latency in seconds"
    );

    describe_counter!(
        format!("{}_flow_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Flows aborted by a component failure"
    );

    // Retrieval metrics
    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Context retrieval latency in seconds"
    );

    describe_histogram!(
        format!("{}_retrieval_snippets", METRICS_PREFIX),
        Unit::Count,
        "Snippets returned per retrieval"
    );

    describe_counter!(
        format!("{}_retrieval_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total retrieval errors"
    );

    // Language model metrics
    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total language model completions"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language model completion latency in seconds"
    );

    describe_counter!(
        format!("{}_llm_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total language model errors"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a router decision
pub fn record_route(route: &str) {
    counter!(
        format!("{}_route_decisions_total", METRICS_PREFIX),
        "route" => route.to_string()
    )
    .increment(1);
}

/// Helper to record retrieval metrics
pub fn record_retrieval(duration_secs: f64, source: &str, snippet_count: usize, success: bool) {
    if success {
        histogram!(
            format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .record(duration_secs);

        histogram!(
            format!("{}_retrieval_snippets", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .record(snippet_count as f64);
    } else {
        counter!(
            format!("{}_retrieval_errors_total", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a language model completion
pub fn record_completion(duration_secs: f64, purpose: &str, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "purpose" => purpose.to_string(),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_llm_duration_seconds", METRICS_PREFIX),
            "purpose" => purpose.to_string(),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_llm_errors_total", METRICS_PREFIX),
            "purpose" => purpose.to_string(),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a finished flow
pub fn record_flow(duration_secs: f64, success: bool) {
    histogram!(format!("{}_flow_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    if !success {
        counter!(format!("{}_flow_failures_total", METRICS_PREFIX)).increment(1);
    }
}
