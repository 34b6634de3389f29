mod noop_metrics;

pub use noop_metrics::NoopMetrics;
use std::sync::Arc;

/// Creates the metrics backend used when `PASSKEY_METRICS_TYPE` is not `prom`.
///
/// Ceremony and request events are dropped and `/metrics` renders empty.
pub fn create() -> anyhow::Result<crate::domain::MetricsPtr> {
    Ok(Arc::new(NoopMetrics::new()))
}
