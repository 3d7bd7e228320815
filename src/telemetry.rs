//! Telemetry utilities for operation timing and span construction.

use std::time::Instant;

/// Guard for timing a coordinator operation and recording metrics.
///
/// Records operation latency when dropped.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_push_latency(self.operation, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for a single channel resolution.
    pub fn resolve(username: &str) -> Span {
        debug_span!("resolve", username = %username)
    }

    /// Create a span for a push coordinator operation.
    pub fn push_operation(name: &str, user: Option<&str>) -> Span {
        if let Some(user) = user {
            info_span!("push", op = %name, user = %user)
        } else {
            info_span!("push", op = %name)
        }
    }
}
