// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the tenant operator.
//!
//! All metrics carry the namespace prefix `tenant_operator_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - reconcile passes per parent kind and outcome
//! - **Queue Metrics** - requeues, dropped keys and queue depth
//! - **Sync Metrics** - derived-object outcomes per derived kind
//! - **Error Metrics** - errors per kind and category
//!
//! # Example
//!
//! ```rust,no_run
//! use tenant_operator::metrics::record_reconciliation;
//!
//! record_reconciliation("Site", "synced", std::time::Duration::from_millis(40));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "tenant_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconcile passes by parent kind and outcome
///
/// Labels:
/// - `resource_type`: Parent kind (`Organization`, `Project`, `Site`)
/// - `outcome`: `synced`, `not_found`, `ignored`, `invalid`, `deleting`, `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and outcome",
    );
    let counter = CounterVec::new(opts, &["resource_type", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconcile passes in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Queue Metrics
// ============================================================================

/// Total number of keys requeued with backoff
///
/// Labels:
/// - `resource_type`: Parent kind
/// - `reason`: Error category that caused the requeue
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of keys dropped after exhausting their retries
pub static DROPPED_KEYS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dropped_keys_total"),
        "Total number of reconcile keys dropped after the retry bound",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Keys waiting in each controller's queue
pub static QUEUE_DEPTH: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_queue_depth"),
        "Number of reconcile keys waiting by resource type",
    );
    let gauge = GaugeVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Sync Metrics
// ============================================================================

/// Derived-object outcomes
///
/// Labels:
/// - `resource_type`: Derived kind (`Secret`, `Deployment`, ...)
/// - `outcome`: `created`, `updated`, `unchanged`, `failed`
pub static SYNC_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_syncs_total"),
        "Total number of derived object syncs by resource type and outcome",
    );
    let counter = CounterVec::new(opts, &["resource_type", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished reconcile pass.
pub fn record_reconciliation(resource_type: &str, outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a requeue caused by an error of category `reason`.
pub fn record_requeue(resource_type: &str, reason: &str) {
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record a key dropped after its last retry.
pub fn record_dropped_key(resource_type: &str) {
    DROPPED_KEYS_TOTAL.with_label_values(&[resource_type]).inc();
}

/// Publish the current depth of a controller's queue.
#[allow(clippy::cast_precision_loss)]
pub fn set_queue_depth(resource_type: &str, depth: usize) {
    QUEUE_DEPTH
        .with_label_values(&[resource_type])
        .set(depth as f64);
}

/// Record a derived-object outcome.
pub fn record_sync(resource_type: &str, outcome: &str) {
    SYNC_TOTAL
        .with_label_values(&[resource_type, outcome])
        .inc();
}

/// Record an error by category.
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Render every registered metric in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
