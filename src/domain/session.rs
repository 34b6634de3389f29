//! Per-session ceremony state.
//!
//! The session store itself is an external capability keyed by an opaque
//! token; the ceremonies only ever touch the two fields named here.

use super::errors::CeremonyError;
use super::webauthn_models::PendingChallenge;
use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

/// Named fields the ceremonies keep in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    /// User currently mid-registration.
    UserId,
    /// Outstanding authentication challenge.
    Challenge,
}

impl SessionField {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            SessionField::UserId => "user_id",
            SessionField::Challenge => "challenge",
        }
    }
}

/// Abstraction for server-side session storage.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    // ---
    async fn get_field(&self, token: &str, field: SessionField) -> Result<Option<String>>;

    async fn set_field(&self, token: &str, field: SessionField, value: &str) -> Result<()>;

    /// Read and remove a field in one step, so a value is consumed once.
    async fn take_field(&self, token: &str, field: SessionField) -> Result<Option<String>>;
}

/// Type alias for any backend that implements SessionStore.
pub type SessionStorePtr = Arc<dyn SessionStore>;

/// Typed view of one session's ceremony state.
pub struct ChallengeSession {
    // ---
    store: SessionStorePtr,
    token: String,
}

impl ChallengeSession {
    // ---
    pub fn new(store: SessionStorePtr, token: String) -> Self {
        // ---
        Self { store, token }
    }

    pub fn token(&self) -> &str {
        // ---
        &self.token
    }

    /// The user recorded by the last registration challenge, if any.
    pub async fn acting_user(&self) -> Result<Option<Uuid>, CeremonyError> {
        // ---
        let raw = self
            .store
            .get_field(&self.token, SessionField::UserId)
            .await
            .map_err(CeremonyError::Session)?;

        // A value that is not a UUID cannot name a user; treat it as absent.
        Ok(raw.and_then(|value| Uuid::parse_str(&value).ok()))
    }

    pub async fn set_acting_user(&self, user_id: Uuid) -> Result<(), CeremonyError> {
        // ---
        self.store
            .set_field(&self.token, SessionField::UserId, &user_id.to_string())
            .await
            .map_err(CeremonyError::Session)
    }

    /// Records the authentication challenge, replacing any earlier one.
    pub async fn set_challenge(&self, challenge: &PendingChallenge) -> Result<(), CeremonyError> {
        // ---
        let encoded = serde_json::to_string(challenge)
            .map_err(|e| CeremonyError::Session(anyhow::Error::new(e)))?;

        self.store
            .set_field(&self.token, SessionField::Challenge, &encoded)
            .await
            .map_err(CeremonyError::Session)
    }

    /// Consumes the authentication challenge.
    pub async fn take_challenge(&self) -> Result<Option<PendingChallenge>, CeremonyError> {
        // ---
        let raw = self
            .store
            .take_field(&self.token, SessionField::Challenge)
            .await
            .map_err(CeremonyError::Session)?;

        match raw {
            Some(encoded) => serde_json::from_str(&encoded)
                .map(Some)
                .map_err(|e| CeremonyError::Session(anyhow::Error::new(e))),
            None => Ok(None),
        }
    }
}
