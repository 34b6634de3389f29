//! Prometheus metrics implementation.
//!
//! This module provides a concrete implementation of the `Metrics` trait using
//! the Prometheus metrics format. It delegates to utility functions in sibling
//! modules (`counters.rs`, `recorder.rs`) which handle the actual metrics
//! collection via the global `metrics` crate registry.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// This struct is empty because metrics are registered globally using
/// macros like `counter!()` and `histogram!()`, and the global PrometheusHandle
/// stored in `recorder.rs` renders them.
#[derive(Default)]
pub struct PrometheusMetrics {
    // Empty - uses global metrics registry pattern
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_registration_started(&self) {
        super::increment_registration_started();
    }

    fn record_registration_completed(&self) {
        tracing::debug!("Recording registration completed event");
        super::increment_registration_completed();
    }

    fn record_authentication_started(&self) {
        super::increment_authentication_started();
    }

    fn record_authentication_completed(&self) {
        tracing::debug!("Recording authentication completed event");
        super::increment_authentication_completed();
    }

    fn record_ceremony_failure(&self, ceremony: &str, kind: &str) {
        super::increment_ceremony_failure(ceremony, kind);
    }

    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16) {
        super::track_http_request(start, path, method, status);
    }
}
