//! Observability handle passed to the service and adapters at construction.
//!
//! Events are emitted under the handle's span and counted in its metrics sink, so nothing in the
//! library depends on a process-wide logger or registry.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;
use tracing::Span;

/// Counters for the registry. Cheap to clone through [Telemetry].
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    models_created: AtomicU64,
    models_updated: AtomicU64,
    models_deleted: AtomicU64,
    status_updates: AtomicU64,
    not_found: AtomicU64,
    internal_errors: AtomicU64,
    /// Failures in best-effort sub-steps that were logged and not propagated.
    swallowed_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub models_created: u64,
    pub models_updated: u64,
    pub models_deleted: u64,
    pub status_updates: u64,
    pub not_found: u64,
    pub internal_errors: u64,
    pub swallowed_failures: u64,
}

impl RegistryMetrics {
    pub fn model_created(&self) {
        self.models_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_updated(&self) {
        self.models_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_deleted(&self) {
        self.models_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status_updated(&self) {
        self.status_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn swallowed_failure(&self) {
        self.swallowed_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            models_created: self.models_created.load(Ordering::Relaxed),
            models_updated: self.models_updated.load(Ordering::Relaxed),
            models_deleted: self.models_deleted.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            swallowed_failures: self.swallowed_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Telemetry {
    span: Span,
    metrics: Arc<RegistryMetrics>,
}

impl Telemetry {
    /// A handle whose events nest under a `registry` span tagged with `service`.
    pub fn new(service: &str) -> Self {
        Self {
            span: tracing::info_span!("registry", service),
            metrics: Arc::default(),
        }
    }

    /// A handle with no parent span, for tests and embedders that do their own logging.
    pub fn detached() -> Self {
        Self {
            span: Span::none(),
            metrics: Arc::default(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }
}
