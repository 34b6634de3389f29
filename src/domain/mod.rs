mod authentication;
mod credential_store;
mod errors;
mod metrics;
mod registration;
mod session;
mod verifier;
mod webauthn_models;

#[cfg(test)]
pub(crate) mod test_support;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Publicly expose the storage and verifier capabilities
pub use credential_store::{CredentialStore, CredentialStorePtr, CredentialTaken};
pub use session::{ChallengeSession, SessionField, SessionStore, SessionStorePtr};
pub use verifier::{
    decode_base64url, AssertionResponse, AttestationResponse, AuthenticationInfo,
    AuthenticationVerification, ChallengeOptions, ExpectedCeremony, IssuedChallenge,
    RegistrationInfo, RegistrationOptionsRequest, RegistrationVerification, RelyingParty,
    Verifier, VerifierError, VerifierPtr,
};
pub use webauthn_models::{AdvisoryTransports, Credential, DeviceType, PendingChallenge, User};

// Ceremony coordinators
pub use authentication::AuthenticationCoordinator;
pub use errors::CeremonyError;
pub use registration::RegistrationCoordinator;
