use crate::app_state::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the `/metrics` endpoint.
///
/// Renders ceremony counters and request timings in Prometheus text format.
/// With the no-op backend the body is empty.
pub async fn metrics_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    // ---
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        app_state.metrics().render(),
    )
}
