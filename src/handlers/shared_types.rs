use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{CeremonyError, Credential, DeviceType, User};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // ---
    pub error: String,
}

impl CeremonyError {
    fn status_code(&self) -> StatusCode {
        // ---
        match self {
            CeremonyError::InvalidRequest(_)
            | CeremonyError::UnknownCredential
            | CeremonyError::ChallengeExpired
            | CeremonyError::Verification(_) => StatusCode::BAD_REQUEST,
            CeremonyError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CeremonyError::UnknownUser => StatusCode::NOT_FOUND,
            CeremonyError::ChallengeGeneration(_)
            | CeremonyError::Store(_)
            | CeremonyError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CeremonyError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status_code();

        // Internal details go to the log only; the caller sees the variant text.
        if self.is_internal() {
            tracing::error!("Ceremony failed: {:?}", self);
        } else {
            tracing::warn!("Ceremony rejected: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Public view of a stored credential: no key material, id as base64url.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    pub id: String,
    pub counter: u32,
    pub device_type: DeviceType,
    pub backup_eligible: bool,
    pub backed_up: bool,
    pub transports: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Credential> for CredentialView {
    fn from(credential: &Credential) -> Self {
        // ---
        Self {
            id: URL_SAFE_NO_PAD.encode(&credential.id),
            counter: credential.counter,
            device_type: credential.device_type,
            backup_eligible: credential.backup_eligible,
            backed_up: credential.backed_up,
            transports: credential.transports.hints().to_vec(),
            created_at: credential.created_at,
        }
    }
}

/// Public view of a user, returned after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub credentials: Vec<CredentialView>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        // ---
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            credentials: user.credentials.iter().map(CredentialView::from).collect(),
            created_at: user.created_at,
        }
    }
}

/// Parses a JSON request body without insisting on a JSON content type.
pub fn parse_json_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, CeremonyError> {
    // ---
    serde_json::from_slice(body)
        .map_err(|e| CeremonyError::InvalidRequest(format!("malformed JSON body: {e}")))
}
