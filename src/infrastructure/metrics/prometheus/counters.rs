use metrics::{counter, histogram};
use std::time::Instant;

/// Increment a counter for issued registration challenges.
pub fn increment_registration_started() {
    counter!("passkey_registrations_started_total").increment(1);
}

/// Increment a counter for credentials bound to users.
pub fn increment_registration_completed() {
    counter!("passkey_registrations_completed_total").increment(1);
}

/// Increment a counter for issued authentication challenges.
pub fn increment_authentication_started() {
    counter!("passkey_authentications_started_total").increment(1);
}

/// Increment a counter for successful logins.
pub fn increment_authentication_completed() {
    counter!("passkey_authentications_completed_total").increment(1);
}

/// Increment a counter for failed ceremony steps.
pub fn increment_ceremony_failure(ceremony: &str, kind: &str) {
    counter!(
        "passkey_ceremony_failures_total",
        "ceremony" => ceremony.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Track HTTP request latency using a histogram.
pub fn track_http_request(start: Instant, path: &str, method: &str, status: u16) {
    let elapsed = start.elapsed();
    histogram!(
        "http_request_duration_seconds",
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(elapsed);
}
