//! Passkey registration ceremony.
//!
//! Two phases:
//! 1. `begin_registration` - resolve or create the user, issue a challenge
//! 2. `complete_registration` - verify the attestation and bind the credential

use super::credential_store::{CredentialStorePtr, CredentialTaken};
use super::errors::CeremonyError;
use super::session::ChallengeSession;
use super::verifier::{
    AttestationResponse, ChallengeOptions, ExpectedCeremony, RegistrationOptionsRequest,
    RegistrationVerification, RelyingParty, VerifierPtr,
};
use super::webauthn_models::{PendingChallenge, User};
use std::time::Duration;

/// Sequences challenge issuance and credential binding for registration.
pub struct RegistrationCoordinator {
    // ---
    store: CredentialStorePtr,
    verifier: VerifierPtr,
    relying_party: RelyingParty,
    challenge_ttl: Duration,
}

impl RegistrationCoordinator {
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

    /// Issues a registration challenge for `email`, creating the user on
    /// first sight.
    ///
    /// The challenge is stored on the user record (superseding any earlier
    /// one) and the user is recorded as the session's acting user.
    pub async fn begin_registration(
        &self,
        session: &ChallengeSession,
        email: &str,
        name: &str,
    ) -> Result<ChallengeOptions, CeremonyError> {
        // ---
        let email = email.trim();
        let name = name.trim();

        if email.is_empty() {
            return Err(CeremonyError::InvalidRequest(
                "email must not be empty".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(CeremonyError::InvalidRequest(
                "name must not be empty".to_string(),
            ));
        }

        let existing = self
            .store
            .find_user_by_email(email)
            .await
            .map_err(CeremonyError::Store)?;

        let mut user = match existing {
            Some(user) => user,
            None => {
                let user = self
                    .store
                    .insert_user_if_absent(User::new(email.to_string(), name.to_string()))
                    .await
                    .map_err(CeremonyError::Store)?;
                tracing::info!("Resolved new registration user: {}", user.id);
                user
            }
        };

        let issued = self
            .verifier
            .generate_registration_options(&RegistrationOptionsRequest {
                rp_name: self.relying_party.name.clone(),
                rp_id: self.relying_party.id.clone(),
                user_id: user.id,
                user_name: user.email.clone(),
                user_display_name: user.name.clone(),
                exclude_credentials: user.credential_ids(),
            })
            .map_err(|e| {
                tracing::error!("Failed to generate registration options: {}", e);
                CeremonyError::ChallengeGeneration(e)
            })?;

        user.current_challenge = Some(PendingChallenge::new(issued.state));
        self.store
            .upsert_user(&user)
            .await
            .map_err(CeremonyError::Store)?;

        session.set_acting_user(user.id).await?;

        tracing::info!("Registration started for user: {}", user.id);

        Ok(issued.options)
    }

    /// Verifies the attestation against the acting user's challenge and, on
    /// success, binds the new credential to that user.
    ///
    /// The outstanding challenge is cleared before the verifier runs, so a
    /// response can be tried at most once whatever the outcome.
    pub async fn complete_registration(
        &self,
        session: &ChallengeSession,
        response: &AttestationResponse,
    ) -> Result<RegistrationVerification, CeremonyError> {
        // ---
        let user_id = session
            .acting_user()
            .await?
            .ok_or(CeremonyError::Unauthenticated)?;

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await
            .map_err(CeremonyError::Store)?
            .ok_or_else(|| {
                tracing::warn!("Session references missing user: {}", user_id);
                CeremonyError::UnknownUser
            })?;

        let challenge = user.current_challenge.take().ok_or_else(|| {
            tracing::warn!("No outstanding registration challenge for user: {}", user_id);
            CeremonyError::Verification("no outstanding registration challenge".to_string())
        })?;

        self.store
            .upsert_user(&user)
            .await
            .map_err(CeremonyError::Store)?;

        if challenge.is_expired(self.challenge_ttl) {
            tracing::warn!("Registration challenge expired for user: {}", user_id);
            return Err(CeremonyError::ChallengeExpired);
        }

        let expected = ExpectedCeremony {
            challenge: challenge.state,
            origin: self.relying_party.origin.clone(),
            rp_id: self.relying_party.id.clone(),
        };

        let verification = self
            .verifier
            .verify_registration_response(response, &expected)
            .map_err(|e| {
                tracing::warn!("Registration verification failed for user {}: {}", user_id, e);
                CeremonyError::Verification(e.to_string())
            })?;

        if !verification.verified {
            tracing::warn!("Registration not verified for user: {}", user_id);
            return Ok(verification);
        }

        let info = verification.registration_info.clone().ok_or_else(|| {
            CeremonyError::Verification("verifier returned no registration info".to_string())
        })?;

        // Credential IDs are globally unique across users.
        let already_bound = self
            .store
            .find_credential_by_id(&info.credential_id)
            .await
            .map_err(CeremonyError::Store)?;
        if already_bound.is_some() {
            tracing::warn!(
                "Credential {} is already registered",
                hex::encode(&info.credential_id)
            );
            return Err(CeremonyError::Verification(
                "credential is already registered".to_string(),
            ));
        }

        let credential_id = hex::encode(&info.credential_id);
        user.credentials
            .push(info.into_credential(response.transports()));

        // A concurrent registration may have bound the same ID since the check.
        self.store.upsert_user(&user).await.map_err(|err| {
            if err.downcast_ref::<CredentialTaken>().is_some() {
                tracing::warn!("Credential {} was bound concurrently", credential_id);
                CeremonyError::Verification("credential is already registered".to_string())
            } else {
                CeremonyError::Store(err)
            }
        })?;

        tracing::info!(
            "Registration completed for user: {} (credential: {})",
            user_id,
            credential_id
        );

        Ok(verification)
    }
}
