use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Represents a user in the passkey system.
///
/// The email is the natural key; `id` is the opaque handle handed to
/// authenticators and stored in sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    // ---
    pub id: Uuid,
    pub email: String,
    pub name: String,

    /// Passkeys bound to this user, in registration order.
    #[serde(default)]
    pub credentials: Vec<Credential>,

    /// Outstanding registration challenge, if a ceremony is in flight.
    #[serde(default)]
    pub current_challenge: Option<PendingChallenge>,

    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(email: String, name: String) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            credentials: Vec::new(),
            current_challenge: None,
            created_at: Utc::now(),
        }
    }

    /// Identifiers of every credential already bound to this user.
    pub fn credential_ids(&self) -> Vec<Vec<u8>> {
        // ---
        self.credentials.iter().map(|c| c.id.clone()).collect()
    }

    pub fn credential_mut(&mut self, credential_id: &[u8]) -> Option<&mut Credential> {
        // ---
        self.credentials
            .iter_mut()
            .find(|c| c.id.as_slice() == credential_id)
    }
}

/// Authenticator classification derived from the backup-eligibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    SingleDevice,
    MultiDevice,
}

impl DeviceType {
    // ---
    pub fn from_backup_eligibility(backup_eligible: bool) -> Self {
        // ---
        if backup_eligible {
            DeviceType::MultiDevice
        } else {
            DeviceType::SingleDevice
        }
    }
}

/// Transport hints (`usb`, `nfc`, `internal`, ...) reported by the client.
///
/// These are copied from the browser's registration response and are NOT
/// covered by the attestation signature. Use them only as UX hints when
/// building future ceremonies, never for policy decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdvisoryTransports(Option<Vec<String>>);

impl AdvisoryTransports {
    // ---
    pub fn unverified(hints: Option<Vec<String>>) -> Self {
        // ---
        Self(hints)
    }

    pub fn hints(&self) -> &[String] {
        // ---
        self.0.as_deref().unwrap_or(&[])
    }
}

/// Represents a WebAuthn credential (passkey) bound to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    // ---
    /// Unique credential ID (from authenticator)
    pub id: Vec<u8>,

    /// Opaque verifier record holding the public key
    pub public_key: Vec<u8>,

    /// Signature counter (for cloned authenticator detection)
    pub counter: u32,

    pub device_type: DeviceType,
    pub backup_eligible: bool,
    pub backed_up: bool,

    #[serde(default)]
    pub transports: AdvisoryTransports,

    /// When this credential was created
    pub created_at: DateTime<Utc>,
}

/// A single-use ceremony challenge together with its issue time.
///
/// `state` is whatever the verifier needs to check the response later; for
/// webauthn-rs it is the serialized ceremony state that embeds the random
/// challenge bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChallenge {
    // ---
    pub state: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    // ---
    pub fn new(state: String) -> Self {
        // ---
        Self {
            state,
            issued_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        // ---
        let age = Utc::now().signed_duration_since(self.issued_at);
        match age.to_std() {
            Ok(age) => age > ttl,
            // Issued "in the future" (clock skew between workers): not expired.
            Err(_) => false,
        }
    }
}
