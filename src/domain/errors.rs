//! Error types for the passkey ceremonies.

use super::verifier::VerifierError;
use thiserror::Error;

/// Everything that can go wrong while running a registration or
/// authentication ceremony.
///
/// Client-caused failures carry a message that is safe to show to the caller.
/// Infrastructure failures wrap the underlying error for logging only.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// Request payload is malformed or missing required fields.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The session holds no state for the step being completed.
    #[error("No ceremony in progress for this session")]
    Unauthenticated,

    /// The user recorded in the session no longer exists.
    #[error("Unknown user")]
    UnknownUser,

    /// The credential named by an assertion was never registered.
    #[error("Unknown credential")]
    UnknownCredential,

    /// The outstanding challenge outlived its time-to-live.
    #[error("Challenge expired")]
    ChallengeExpired,

    /// The verifier rejected the response.
    #[error("Verification failed: {0}")]
    Verification(String),

    /// The verifier could not produce challenge options.
    #[error("Failed to generate challenge")]
    ChallengeGeneration(#[source] VerifierError),

    /// Credential store I/O failure.
    #[error("Credential store error")]
    Store(#[source] anyhow::Error),

    /// Session store I/O failure.
    #[error("Session store error")]
    Session(#[source] anyhow::Error),
}

impl CeremonyError {
    /// Short machine-readable label, used for metrics.
    pub fn kind(&self) -> &'static str {
        // ---
        match self {
            CeremonyError::InvalidRequest(_) => "invalid_request",
            CeremonyError::Unauthenticated => "unauthenticated",
            CeremonyError::UnknownUser => "unknown_user",
            CeremonyError::UnknownCredential => "unknown_credential",
            CeremonyError::ChallengeExpired => "challenge_expired",
            CeremonyError::Verification(_) => "verification",
            CeremonyError::ChallengeGeneration(_) => "challenge_generation",
            CeremonyError::Store(_) => "store",
            CeremonyError::Session(_) => "session",
        }
    }

    /// True for failures caused by the server rather than the caller.
    pub fn is_internal(&self) -> bool {
        // ---
        matches!(
            self,
            CeremonyError::ChallengeGeneration(_)
                | CeremonyError::Store(_)
                | CeremonyError::Session(_)
        )
    }
}
