use std::sync::Arc;
use std::time::Instant;

/// Abstraction for application metrics (counters, histograms).
pub trait Metrics: Send + Sync + 'static {
    // ---
    /// Render current metrics in Prometheus text format.
    fn render(&self) -> String;

    /// Record a registration challenge being issued.
    fn record_registration_started(&self);

    /// Record a credential being bound to a user.
    fn record_registration_completed(&self);

    /// Record an authentication challenge being issued.
    fn record_authentication_started(&self);

    /// Record a successful passkey login.
    fn record_authentication_completed(&self);

    /// Record a failed ceremony step, labelled by ceremony and error kind.
    fn record_ceremony_failure(&self, ceremony: &str, kind: &str);

    /// Record HTTP request duration and labels.
    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16);
}

/// Type alias for any backend that implements Metrics.
pub type MetricsPtr = Arc<dyn Metrics>;
