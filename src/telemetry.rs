//! Best-effort error reporting.
//!
//! Recording never surfaces errors to the host application. Failures that cost a
//! record, a resource or an element are reported here instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error};

/// Sink for recording failures
pub trait Telemetry: Send + Sync {
    /// Report an error. `kind` is a short machine-friendly category.
    fn error(&self, message: &str, kind: &str);

    /// Report a non-error diagnostic
    fn debug(&self, message: &str) {
        debug!("{}", message);
    }
}

/// Forwards everything to `tracing`
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn error(&self, message: &str, kind: &str) {
        error!(kind = kind, "{}", message);
    }
}

/// Counts reported errors, also forwarding them to `tracing`
#[derive(Debug, Default)]
pub struct CountingTelemetry {
    errors: AtomicUsize,
}

impl CountingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of errors reported so far
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Telemetry for CountingTelemetry {
    fn error(&self, message: &str, kind: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!(kind = kind, "{}", message);
    }
}
