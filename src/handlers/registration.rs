//! Passkey registration handlers.
//!
//! Implements the two-step registration ceremony:
//! 1. `generate_registration_options` - issue a challenge for an email address
//! 2. `verify_registration` - check the attestation and bind the credential

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tower_cookies::Cookies;

use super::shared_types::parse_json_body;
use crate::app_state::AppState;
use crate::domain::{
    AttestationResponse, CeremonyError, ChallengeOptions, RegistrationVerification,
};
use crate::session::{current_token, ensure_token};

const CEREMONY: &str = "registration";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationOptionsRequest {
    // ---
    pub email: String,
    pub name: String,
}

/// POST /generate-registration-options
///
/// Creates the user on first sight of the email, records it as the
/// session's acting user and returns the credential creation options.
///
/// # Request Body
/// ```json
/// { "email": "a@x.com", "name": "Alice" }
/// ```
pub async fn generate_registration_options(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Bytes,
) -> Result<Json<Value>, CeremonyError> {
    // ---
    match begin(&state, &cookies, &body).await {
        Ok(options) => {
            state.metrics().record_registration_started();
            Ok(Json(options.as_json().clone()))
        }
        Err(err) => {
            state.metrics().record_ceremony_failure(CEREMONY, err.kind());
            Err(err)
        }
    }
}

/// POST /verify-registration
///
/// Verifies the authenticator's attestation against the acting user's
/// outstanding challenge. A response the verifier does not accept is
/// returned with `400 Bad Request` and nothing is stored.
pub async fn verify_registration(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Bytes,
) -> Result<Response, CeremonyError> {
    // ---
    match complete(&state, &cookies, &body).await {
        Ok(verification) if verification.verified => {
            state.metrics().record_registration_completed();
            Ok((StatusCode::OK, Json(verification)).into_response())
        }
        Ok(verification) => {
            state
                .metrics()
                .record_ceremony_failure(CEREMONY, "not_verified");
            Ok((StatusCode::BAD_REQUEST, Json(verification)).into_response())
        }
        Err(err) => {
            state.metrics().record_ceremony_failure(CEREMONY, err.kind());
            Err(err)
        }
    }
}

async fn begin(
    state: &AppState,
    cookies: &Cookies,
    body: &[u8],
) -> Result<ChallengeOptions, CeremonyError> {
    // ---
    let request: RegistrationOptionsRequest = parse_json_body(body)?;
    let session = state.challenge_session(ensure_token(cookies));

    state
        .registration()
        .begin_registration(&session, &request.email, &request.name)
        .await
}

async fn complete(
    state: &AppState,
    cookies: &Cookies,
    body: &[u8],
) -> Result<RegistrationVerification, CeremonyError> {
    // ---
    let token = current_token(cookies).ok_or(CeremonyError::Unauthenticated)?;
    let attestation = AttestationResponse::new(parse_json_body(body)?);
    let session = state.challenge_session(token);

    state
        .registration()
        .complete_registration(&session, &attestation)
        .await
}
