//! Passkey authentication handlers.
//!
//! Login is username-less: the options carry no allowed credentials and the
//! credential named in the assertion identifies the user.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tower_cookies::Cookies;

use super::shared_types::{parse_json_body, UserView};
use crate::app_state::AppState;
use crate::domain::{AssertionResponse, AuthenticationVerification, CeremonyError, User};
use crate::session::{current_token, ensure_token};

const CEREMONY: &str = "authentication";

#[derive(Debug, Serialize)]
pub struct AuthenticationResponse {
    // ---
    pub verification: AuthenticationVerification,
    pub user: UserView,
}

/// GET /generate-authentication-options
///
/// Stores a fresh challenge in the session and returns the credential
/// request options.
pub async fn generate_authentication_options(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<Value>, CeremonyError> {
    // ---
    let session = state.challenge_session(ensure_token(&cookies));

    match state.authentication().begin_authentication(&session).await {
        Ok(options) => {
            state.metrics().record_authentication_started();
            Ok(Json(options.as_json().clone()))
        }
        Err(err) => {
            state.metrics().record_ceremony_failure(CEREMONY, err.kind());
            Err(err)
        }
    }
}

/// POST /verify-authentication
///
/// Verifies an assertion against the session's challenge and reports the
/// user who owns the credential.
pub async fn verify_authentication(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Bytes,
) -> Result<Json<AuthenticationResponse>, CeremonyError> {
    // ---
    match complete(&state, &cookies, &body).await {
        Ok((verification, user)) => {
            state.metrics().record_authentication_completed();

            Ok(Json(AuthenticationResponse {
                verification,
                user: UserView::from(&user),
            }))
        }
        Err(err) => {
            state.metrics().record_ceremony_failure(CEREMONY, err.kind());
            Err(err)
        }
    }
}

async fn complete(
    state: &AppState,
    cookies: &Cookies,
    body: &[u8],
) -> Result<(AuthenticationVerification, User), CeremonyError> {
    // ---
    let token = current_token(cookies).ok_or(CeremonyError::Unauthenticated)?;
    let assertion = AssertionResponse::new(parse_json_body(body)?);
    let session = state.challenge_session(token);

    state
        .authentication()
        .complete_authentication(&session, &assertion)
        .await
}
