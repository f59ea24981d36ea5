//! Prometheus metrics for detail commits

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};

// ── Commit metrics ───────────────────────────────────────────────────────────

pub static COMMITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auditor_commits_total",
        "Detail commits sent to the service",
        &["status"]
    )
    .unwrap()
});

pub static DETAIL_RECORDS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "auditor_detail_records_total",
        "Detail records delivered to the service"
    )
    .unwrap()
});

pub static DROPPED_RECORDS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "auditor_dropped_records_total",
        "Detail records lost because their commit failed"
    )
    .unwrap()
});

pub static COMMIT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "auditor_commit_duration_seconds",
        "Latency of detail commits",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

// ── Buffer metrics ───────────────────────────────────────────────────────────

pub static PENDING_DETAILS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "auditor_pending_details",
        "Detail entries waiting in buffers across open events"
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
