//! Prometheus metrics collection for superfeed.
//!
//! - `superfeed_resolutions_total{case}` - Channel resolutions by outcome
//!   (top_level, related, unconfigured, not_found)
//! - `superfeed_push_operations_total{operation,outcome}` - Coordinator
//!   operations and their result code
//! - `superfeed_push_operation_duration_seconds{operation}` - Operation latency
//! - `superfeed_notifications_total{route}` - Notification attempts by route
//!   (toast, platform, dropped, failed)
//!
//! Recording before [`init`] is a no-op.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{Once, OnceLock};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

static INIT: Once = Once::new();

/// Channel resolutions by case.
pub static RESOLUTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Push coordinator operations by outcome.
pub static PUSH_OPERATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Push coordinator operation latency.
pub static PUSH_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Notification attempts by route.
pub static NOTIFICATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init() {
    INIT.call_once(|| {
        let r = registry();

        // Helper macro to register metric
        macro_rules! register {
            ($metric:ident, $init:expr) => {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, metric = stringify!($metric), "Failed to register metric");
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, metric = stringify!($metric), "Failed to create metric");
                    }
                }
            };
        }

        register!(RESOLUTIONS, IntCounterVec::new(Opts::new("superfeed_resolutions_total", "Channel resolutions by case"), &["case"]));
        register!(PUSH_OPERATIONS, IntCounterVec::new(Opts::new("superfeed_push_operations_total", "Push coordinator operations by outcome"), &["operation", "outcome"]));
        register!(PUSH_LATENCY, HistogramVec::new(
            HistogramOpts::new("superfeed_push_operation_duration_seconds", "Push coordinator operation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["operation"]));
        register!(NOTIFICATIONS, IntCounterVec::new(Opts::new("superfeed_notifications_total", "Notification attempts by route"), &["route"]));
    });
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record one channel resolution.
#[inline]
pub fn record_resolution(case: &str) {
    if let Some(c) = RESOLUTIONS.get() {
        c.with_label_values(&[case]).inc();
    }
}

/// Record a finished coordinator operation.
#[inline]
pub fn record_push_operation(operation: &str, outcome: &str) {
    if let Some(c) = PUSH_OPERATIONS.get() {
        c.with_label_values(&[operation, outcome]).inc();
    }
}

/// Record coordinator operation latency.
#[inline]
pub fn record_push_latency(operation: &str, duration_secs: f64) {
    if let Some(h) = PUSH_LATENCY.get() {
        h.with_label_values(&[operation]).observe(duration_secs);
    }
}

/// Record a notification attempt.
#[inline]
pub fn record_notification(route: &str) {
    if let Some(c) = NOTIFICATIONS.get() {
        c.with_label_values(&[route]).inc();
    }
}
