mod memory;
pub mod metrics;
mod redis;
mod webauthn;

// Re-export the factory functions for easy access
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use webauthn::{create_webauthn, create_webauthn_verifier, WebauthnVerifier};

// Store implementations
pub use self::redis::{RedisCredentialStore, RedisSessionStore};
pub use memory::{InMemoryCredentialStore, InMemorySessionStore};
