//! Telemetry utilities for delivery timing and span construction.

use std::time::Instant;

use tracing::debug;

/// Guard timing one delivery.
///
/// Logs the elapsed time when dropped, on every exit path.
pub struct DeliveryTimer {
    alias: String,
    start: Instant,
}

impl DeliveryTimer {
    /// Start timing a delivery.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for DeliveryTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(alias = %self.alias, elapsed_ms, "delivery finished");
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one delivery.
    pub fn delivery(alias: &str, server: &str) -> Span {
        info_span!("delivery", alias = %alias, server = %server)
    }
}
