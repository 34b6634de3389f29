//! Passkey authentication ceremony.
//!
//! Username-less: the challenge lives in the session until the assertion
//! names a credential, which in turn names the user.

use super::credential_store::CredentialStorePtr;
use super::errors::CeremonyError;
use super::session::ChallengeSession;
use super::verifier::{
    AssertionResponse, AuthenticationVerification, ChallengeOptions, ExpectedCeremony,
    RelyingParty, VerifierPtr,
};
use super::webauthn_models::{PendingChallenge, User};
use std::time::Duration;

/// Message returned to clients for every rejected assertion.
const AUTHENTICATION_FAILED: &str = "Authentication failed";

/// Sequences challenge issuance and assertion verification for login.
pub struct AuthenticationCoordinator {
    // ---
    store: CredentialStorePtr,
    verifier: VerifierPtr,
    relying_party: RelyingParty,
    challenge_ttl: Duration,
}

impl AuthenticationCoordinator {
    // ---
    pub fn new(
        store: CredentialStorePtr,
        verifier: VerifierPtr,
        relying_party: RelyingParty,
        challenge_ttl: Duration,
    ) -> Self {
        // ---
        Self {
            store,
            verifier,
            relying_party,
            challenge_ttl,
        }
    }

    /// Issues an authentication challenge and parks it in the session.
    pub async fn begin_authentication(
        &self,
        session: &ChallengeSession,
    ) -> Result<ChallengeOptions, CeremonyError> {
        // ---
        let issued = self.verifier.generate_authentication_options().map_err(|e| {
            tracing::error!("Failed to generate authentication options: {}", e);
            CeremonyError::ChallengeGeneration(e)
        })?;

        session
            .set_challenge(&PendingChallenge::new(issued.state))
            .await?;

        tracing::debug!("Authentication challenge issued");

        Ok(issued.options)
    }

    /// Verifies an assertion against the session's challenge and the stored
    /// credential it names, returning the owning user on success.
    ///
    /// # Flow
    /// 1. Resolve the claimed credential through the credential index
    /// 2. Consume the session challenge (atomic take)
    /// 3. Verify the assertion with the stored credential
    /// 4. Check the signature counter and persist an advance
    /// 5. Load and return the user
    ///
    /// # Security
    /// - Verifier detail is logged, never returned
    /// - An unknown credential is rejected before the session is touched
    pub async fn complete_authentication(
        &self,
        session: &ChallengeSession,
        response: &AssertionResponse,
    ) -> Result<(AuthenticationVerification, User), CeremonyError> {
        // ---
        let credential_id = response.credential_id().ok_or_else(|| {
            CeremonyError::InvalidRequest("assertion is missing a credential id".to_string())
        })?;

        let (user_id, credential) = self
            .store
            .find_credential_by_id(&credential_id)
            .await
            .map_err(CeremonyError::Store)?
            .ok_or_else(|| {
                tracing::warn!(
                    "Assertion for unknown credential: {}",
                    hex::encode(&credential_id)
                );
                CeremonyError::UnknownCredential
            })?;

        let challenge = session
            .take_challenge()
            .await?
            .ok_or(CeremonyError::Unauthenticated)?;

        if challenge.is_expired(self.challenge_ttl) {
            tracing::warn!("Authentication challenge expired");
            return Err(CeremonyError::ChallengeExpired);
        }

        let expected = ExpectedCeremony {
            challenge: challenge.state,
            origin: self.relying_party.origin.clone(),
            rp_id: self.relying_party.id.clone(),
        };

        let verification = self
            .verifier
            .verify_authentication_response(response, &expected, &credential)
            .map_err(|e| {
                tracing::warn!(
                    "Authentication verification failed for credential {}: {}",
                    hex::encode(&credential_id),
                    e
                );
                CeremonyError::Verification(AUTHENTICATION_FAILED.to_string())
            })?;

        if !verification.verified {
            tracing::warn!(
                "Assertion not verified for credential: {}",
                hex::encode(&credential_id)
            );
            return Err(CeremonyError::Verification(AUTHENTICATION_FAILED.to_string()));
        }

        let info = verification.authentication_info.clone().ok_or_else(|| {
            CeremonyError::Verification(AUTHENTICATION_FAILED.to_string())
        })?;

        // Both zero means the authenticator does not keep a counter.
        let counter_in_use = info.new_counter > 0 || credential.counter > 0;
        if counter_in_use && info.new_counter <= credential.counter {
            tracing::error!(
                "Signature counter did not advance for credential {}: stored={}, provided={}",
                hex::encode(&credential_id),
                credential.counter,
                info.new_counter
            );
            return Err(CeremonyError::Verification(AUTHENTICATION_FAILED.to_string()));
        }

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await
            .map_err(CeremonyError::Store)?
            .ok_or_else(|| {
                tracing::error!("Credential index points at missing user: {}", user_id);
                CeremonyError::UnknownUser
            })?;

        if info.new_counter > credential.counter {
            if let Some(stored) = user.credential_mut(&credential_id) {
                stored.counter = info.new_counter;
                if let Some(updated) = info.updated_public_key {
                    stored.public_key = updated;
                }
            }
            self.store
                .upsert_user(&user)
                .await
                .map_err(CeremonyError::Store)?;
            tracing::debug!(
                "Advanced signature counter for credential {} to {}",
                hex::encode(&credential_id),
                info.new_counter
            );
        }

        tracing::info!("User {} authenticated successfully", user.id);

        Ok((verification, user))
    }
}
