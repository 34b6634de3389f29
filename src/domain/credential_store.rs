use super::webauthn_models::{Credential, User};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// `upsert_user` refused to repoint a credential index entry owned by
/// another user. Carried inside the `anyhow::Error` so callers can
/// downcast it.
#[derive(Debug, Error)]
#[error("credential {credential_id} is bound to another user")]
pub struct CredentialTaken {
    /// Hex form of the credential ID.
    pub credential_id: String,
}

/// Abstraction for durable user and credential persistence.
///
/// Lookups return `Ok(None)` for "not found"; `Err` is reserved for store
/// I/O failures so an outage is never reported as an unknown user.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    // ---
    /// Get user by email (natural key).
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by ID.
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Resolve a credential ID to its owner and record without scanning users.
    async fn find_credential_by_id(&self, credential_id: &[u8])
        -> Result<Option<(Uuid, Credential)>>;

    /// Create `user` unless its email is already taken.
    ///
    /// Returns the record that owns the email afterwards: `user` itself if it
    /// won, otherwise the previously stored user.
    async fn insert_user_if_absent(&self, user: User) -> Result<User>;

    /// Replace the full user record.
    ///
    /// The primary record, the email index and one index entry per credential
    /// are written together; either all of them land or none do. Fails with
    /// [`CredentialTaken`] if any credential is indexed under another user.
    async fn upsert_user(&self, user: &User) -> Result<()>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<()> {
        // ---
        Ok(())
    }
}

/// Type alias for any backend that implements CredentialStore.
pub type CredentialStorePtr = Arc<dyn CredentialStore>;
