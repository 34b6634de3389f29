//! Shared fixtures for coordinator unit tests.

use super::authentication::AuthenticationCoordinator;
use super::registration::RegistrationCoordinator;
use super::session::ChallengeSession;
use super::verifier::{
    AssertionResponse, AttestationResponse, AuthenticationInfo, AuthenticationVerification,
    ChallengeOptions, ExpectedCeremony, IssuedChallenge, RegistrationInfo,
    RegistrationOptionsRequest, RegistrationVerification, RelyingParty, Verifier, VerifierError,
};
use super::credential_store::CredentialStore;
use anyhow::bail;
use super::webauthn_models::{Credential, DeviceType, User};
use crate::infrastructure::{InMemoryCredentialStore, InMemorySessionStore};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub(crate) fn test_relying_party() -> RelyingParty {
    // ---
    RelyingParty {
        id: "localhost".to_string(),
        name: "Test App".to_string(),
        origin: "http://localhost:8080".to_string(),
    }
}

/// Verifier stand-in that trusts the client.
///
/// The issued "state" doubles as the challenge. A response carrying a
/// `clientChallenge` that differs from the expected challenge is rejected,
/// which is how tests model a signature over the wrong challenge.
pub(crate) struct StubVerifier {
    pub registration_verified: bool,
    pub authentication_verified: bool,
    pub credential_id: Vec<u8>,
    pub authentication_counter: u32,
}

impl Default for StubVerifier {
    fn default() -> Self {
        // ---
        Self {
            registration_verified: true,
            authentication_verified: true,
            credential_id: vec![0x01],
            authentication_counter: 0,
        }
    }
}

impl StubVerifier {
    // ---
    fn check_challenge(
        response: &serde_json::Value,
        expected: &ExpectedCeremony,
    ) -> Result<(), VerifierError> {
        // ---
        match response.get("clientChallenge").and_then(|c| c.as_str()) {
            Some(signed) if signed != expected.challenge => {
                Err(VerifierError("challenge mismatch".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl Verifier for StubVerifier {
    // ---
    fn generate_registration_options(
        &self,
        request: &RegistrationOptionsRequest,
    ) -> Result<IssuedChallenge, VerifierError> {
        // ---
        let state = format!("reg:{}", Uuid::new_v4());
        let exclude: Vec<String> = request
            .exclude_credentials
            .iter()
            .map(|id| URL_SAFE_NO_PAD.encode(id))
            .collect();

        Ok(IssuedChallenge {
            options: ChallengeOptions::new(json!({
                "publicKey": {
                    "challenge": state,
                    "rp": { "id": request.rp_id, "name": request.rp_name },
                    "user": {
                        "id": request.user_id.to_string(),
                        "name": request.user_name,
                        "displayName": request.user_display_name,
                    },
                    "excludeCredentials": exclude,
                }
            })),
            state,
        })
    }

    fn verify_registration_response(
        &self,
        response: &AttestationResponse,
        expected: &ExpectedCeremony,
    ) -> Result<RegistrationVerification, VerifierError> {
        // ---
        Self::check_challenge(response.as_json(), expected)?;

        if !self.registration_verified {
            return Ok(RegistrationVerification {
                verified: false,
                registration_info: None,
            });
        }

        Ok(RegistrationVerification {
            verified: true,
            registration_info: Some(RegistrationInfo {
                credential_id: self.credential_id.clone(),
                public_key: b"stub-public-key".to_vec(),
                counter: 0,
                device_type: DeviceType::SingleDevice,
                backup_eligible: false,
                backed_up: false,
            }),
        })
    }

    fn generate_authentication_options(&self) -> Result<IssuedChallenge, VerifierError> {
        // ---
        let state = format!("auth:{}", Uuid::new_v4());
        Ok(IssuedChallenge {
            options: ChallengeOptions::new(json!({
                "publicKey": { "challenge": state, "userVerification": "preferred" }
            })),
            state,
        })
    }

    fn verify_authentication_response(
        &self,
        response: &AssertionResponse,
        expected: &ExpectedCeremony,
        credential: &Credential,
    ) -> Result<AuthenticationVerification, VerifierError> {
        // ---
        Self::check_challenge(response.as_json(), expected)?;

        if response.credential_id().as_deref() != Some(credential.id.as_slice()) {
            return Err(VerifierError("credential mismatch".to_string()));
        }

        if !self.authentication_verified {
            return Ok(AuthenticationVerification {
                verified: false,
                authentication_info: None,
            });
        }

        Ok(AuthenticationVerification {
            verified: true,
            authentication_info: Some(AuthenticationInfo {
                credential_id: credential.id.clone(),
                new_counter: self.authentication_counter,
                user_verified: true,
                updated_public_key: None,
            }),
        })
    }
}

/// Coordinators wired to in-memory stores and a stub verifier.
pub(crate) struct Harness {
    pub store: Arc<InMemoryCredentialStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub registration: RegistrationCoordinator,
    pub authentication: AuthenticationCoordinator,
}

impl Harness {
    // ---
    pub fn new(verifier: StubVerifier) -> Self {
        // ---
        Self::with_ttl(verifier, Duration::from_secs(300))
    }

    pub fn with_ttl(verifier: StubVerifier, challenge_ttl: Duration) -> Self {
        // ---
        let store = Arc::new(InMemoryCredentialStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let verifier = Arc::new(verifier);

        Self {
            registration: RegistrationCoordinator::new(
                store.clone(),
                verifier.clone(),
                test_relying_party(),
                challenge_ttl,
            ),
            authentication: AuthenticationCoordinator::new(
                store.clone(),
                verifier,
                test_relying_party(),
                challenge_ttl,
            ),
            store,
            sessions,
        }
    }

    pub fn session(&self, token: &str) -> ChallengeSession {
        // ---
        ChallengeSession::new(self.sessions.clone(), token.to_string())
    }
}

/// Credential store whose backend is unreachable: every call fails.
pub(crate) struct UnavailableCredentialStore;

#[async_trait::async_trait]
impl CredentialStore for UnavailableCredentialStore {
    // ---
    async fn find_user_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
        bail!("connection refused")
    }
    async fn find_user_by_id(&self, _user_id: Uuid) -> anyhow::Result<Option<User>> {
        bail!("connection refused")
    }
    async fn find_credential_by_id(
        &self,
        _credential_id: &[u8],
    ) -> anyhow::Result<Option<(Uuid, Credential)>> {
        bail!("connection refused")
    }
    async fn insert_user_if_absent(&self, _user: User) -> anyhow::Result<User> {
        bail!("connection refused")
    }
    async fn upsert_user(&self, _user: &User) -> anyhow::Result<()> {
        bail!("connection refused")
    }
    async fn ping(&self) -> anyhow::Result<()> {
        bail!("connection refused")
    }
}

impl Harness {
    /// Coordinators over an unreachable credential store, with working sessions.
    pub fn unavailable_store() -> (
        RegistrationCoordinator,
        AuthenticationCoordinator,
        Arc<InMemorySessionStore>,
    ) {
        // ---
        let store = Arc::new(UnavailableCredentialStore);
        let verifier = Arc::new(StubVerifier::default());
        let ttl = Duration::from_secs(300);

        (
            RegistrationCoordinator::new(
                store.clone(),
                verifier.clone(),
                test_relying_party(),
                ttl,
            ),
            AuthenticationCoordinator::new(store, verifier, test_relying_party(), ttl),
            Arc::new(InMemorySessionStore::new()),
        )
    }
}
