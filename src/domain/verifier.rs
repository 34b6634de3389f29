//! The attestation/assertion verifier capability.
//!
//! Challenge generation and all cryptographic checks live behind the
//! [`Verifier`] trait so the ceremony coordinators can be exercised with a
//! stub. The production implementation wraps webauthn-rs.

use super::webauthn_models::{AdvisoryTransports, Credential, DeviceType};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Relying party identity
// ============================================================================

/// Identity this service presents to authenticators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Hostname the credentials are scoped to.
    pub id: String,
    /// Human-readable name shown by the authenticator.
    pub name: String,
    /// Origin the browser must report in client data.
    pub origin: String,
}

// ============================================================================
// Client payloads
// ============================================================================

/// Challenge options handed verbatim to the browser's authenticator API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeOptions(serde_json::Value);

impl ChallengeOptions {
    // ---
    pub fn new(value: serde_json::Value) -> Self {
        // ---
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        // ---
        &self.0
    }
}

/// Registration response produced by `navigator.credentials.create()`.
///
/// Kept as raw JSON; only the verifier interprets its structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationResponse(serde_json::Value);

impl AttestationResponse {
    // ---
    pub fn new(value: serde_json::Value) -> Self {
        // ---
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        // ---
        &self.0
    }

    /// Transport hints from `response.transports`, unverified.
    pub fn transports(&self) -> AdvisoryTransports {
        // ---
        let hints = self
            .0
            .pointer("/response/transports")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            });
        AdvisoryTransports::unverified(hints)
    }
}

/// Authentication response produced by `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssertionResponse(serde_json::Value);

impl AssertionResponse {
    // ---
    pub fn new(value: serde_json::Value) -> Self {
        // ---
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        // ---
        &self.0
    }

    /// Credential ID claimed by the assertion (`rawId`, falling back to `id`).
    pub fn credential_id(&self) -> Option<Vec<u8>> {
        // ---
        ["rawId", "id"]
            .iter()
            .filter_map(|field| self.0.get(*field).and_then(|v| v.as_str()))
            .find_map(decode_base64url)
    }
}

/// Decodes base64url, tolerating trailing padding.
pub fn decode_base64url(encoded: &str) -> Option<Vec<u8>> {
    // ---
    let trimmed = encoded.trim_end_matches('=');
    if trimmed.is_empty() {
        return None;
    }
    URL_SAFE_NO_PAD.decode(trimmed).ok()
}

fn as_base64url<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    // ---
    serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
}

// ============================================================================
// Verifier inputs and outputs
// ============================================================================

/// Parameters for a registration challenge.
#[derive(Debug, Clone)]
pub struct RegistrationOptionsRequest {
    pub rp_name: String,
    pub rp_id: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_display_name: String,
    /// Authenticators already bound to the user; they must not re-register.
    pub exclude_credentials: Vec<Vec<u8>>,
}

/// Options for the browser plus the state needed to verify the response.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub options: ChallengeOptions,
    pub state: String,
}

/// What a response must match to be accepted.
#[derive(Debug, Clone)]
pub struct ExpectedCeremony {
    pub challenge: String,
    pub origin: String,
    pub rp_id: String,
}

/// Fields extracted from a verified attestation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInfo {
    #[serde(rename = "credentialID", serialize_with = "as_base64url")]
    pub credential_id: Vec<u8>,
    #[serde(skip_serializing)]
    pub public_key: Vec<u8>,
    pub counter: u32,
    #[serde(rename = "credentialDeviceType")]
    pub device_type: DeviceType,
    pub backup_eligible: bool,
    #[serde(rename = "credentialBackedUp")]
    pub backed_up: bool,
}

impl RegistrationInfo {
    /// Builds the stored credential, attaching the client's transport hints.
    pub fn into_credential(self, transports: AdvisoryTransports) -> Credential {
        // ---
        Credential {
            id: self.credential_id,
            public_key: self.public_key,
            counter: self.counter,
            device_type: self.device_type,
            backup_eligible: self.backup_eligible,
            backed_up: self.backed_up,
            transports,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationVerification {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_info: Option<RegistrationInfo>,
}

/// Fields extracted from a verified assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInfo {
    #[serde(rename = "credentialID", serialize_with = "as_base64url")]
    pub credential_id: Vec<u8>,
    pub new_counter: u32,
    pub user_verified: bool,
    /// Verifier record with the new counter folded in, when it changed.
    #[serde(skip_serializing)]
    pub updated_public_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationVerification {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_info: Option<AuthenticationInfo>,
}

/// Error raised by a verifier; the message is the verifier's own.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct VerifierError(pub String);

// ============================================================================
// Capability
// ============================================================================

/// Challenge generation and response verification.
///
/// Calls are synchronous from the coordinator's point of view; a hung
/// verifier is bounded by the HTTP server's request handling, not here.
pub trait Verifier: Send + Sync {
    // ---
    fn generate_registration_options(
        &self,
        request: &RegistrationOptionsRequest,
    ) -> Result<IssuedChallenge, VerifierError>;

    fn verify_registration_response(
        &self,
        response: &AttestationResponse,
        expected: &ExpectedCeremony,
    ) -> Result<RegistrationVerification, VerifierError>;

    /// Username-less challenge; user verification is preferred.
    fn generate_authentication_options(&self) -> Result<IssuedChallenge, VerifierError>;

    fn verify_authentication_response(
        &self,
        response: &AssertionResponse,
        expected: &ExpectedCeremony,
        credential: &Credential,
    ) -> Result<AuthenticationVerification, VerifierError>;
}

/// Type alias for any backend that implements Verifier.
pub type VerifierPtr = Arc<dyn Verifier>;
