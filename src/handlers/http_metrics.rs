//! HTTP request metrics middleware.

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::app_state::AppState;

/// Records duration, method, route and status of every request.
///
/// The route template is used as the path label so unmatched paths cannot
/// grow label cardinality.
pub async fn track_http_metrics(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // ---
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state
        .metrics()
        .record_http_request(start, &path, &method, response.status().as_u16());

    response
}
