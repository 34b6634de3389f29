use crate::domain::Metrics;
use std::time::Instant;

/// No-op metrics implementation for testing.
#[derive(Default)]
pub struct NoopMetrics;

impl NoopMetrics {
    pub fn new() -> Self {
        NoopMetrics
    }
}

impl Metrics for NoopMetrics {
    // ---
    fn render(&self) -> String {
        String::new()
    }
    fn record_registration_started(&self) {}
    fn record_registration_completed(&self) {}
    fn record_authentication_started(&self) {}
    fn record_authentication_completed(&self) {}
    fn record_ceremony_failure(&self, _: &str, _: &str) {}
    fn record_http_request(&self, _: Instant, _: &str, _: &str, _: u16) {}
}
