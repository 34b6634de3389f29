// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::domain::RelyingParty;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
///
/// Missing configuration is treated as a deployment error,
/// not a recoverable runtime condition.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
///
/// This macro is intended for config unit tests only and enforces
/// consistent error messages across failure cases.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis: redis::RedisConfig,
    pub webauthn: webauthn::WebAuthnConfig,
    pub server: server::ServerConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            redis: redis::RedisConfig::from_env()?,
            webauthn: webauthn::WebAuthnConfig::from_env()?,
            server: server::ServerConfig::from_env(),
        })
    }
}

// ============================================================
// Redis configuration
// ============================================================

mod redis {
    // ---
    use super::*;

    /// Redis-related configuration.
    ///
    /// Redis holds both the durable credential records and the per-session
    /// ceremony state, each with its own time-to-live.
    #[derive(Debug, Clone)]
    pub struct RedisConfig {
        /// Redis connection string.
        pub url: String,

        /// Lifetime of an issued ceremony challenge. Defaults to 300 seconds.
        pub challenge_ttl: Duration,

        /// Lifetime of session data after its last write. Defaults to one day.
        pub session_ttl: Duration,
    }

    impl RedisConfig {
        /// Builds a [`RedisConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing, or if
        /// either TTL is zero.
        pub fn from_env() -> Result<Self> {
            // ---
            let url = required_env!("PASSKEY_REDIS_URL");

            let challenge_ttl_secs = optional_env_parse!("PASSKEY_CHALLENGE_TTL_SEC", u64, 300);
            let session_ttl_secs = optional_env_parse!("PASSKEY_SESSION_TTL_SEC", u64, 86_400);

            // Redis EXPIRE with 0 deletes the key on the spot
            if challenge_ttl_secs == 0 {
                bail!("PASSKEY_CHALLENGE_TTL_SEC must be greater than zero");
            }
            if session_ttl_secs == 0 {
                bail!("PASSKEY_SESSION_TTL_SEC must be greater than zero");
            }

            Ok(Self {
                url,
                challenge_ttl: Duration::from_secs(challenge_ttl_secs),
                session_ttl: Duration::from_secs(session_ttl_secs),
            })
        }
    }
}
pub use redis::RedisConfig;

// ============================================================
// WebAuthn configuration
// ============================================================

mod webauthn {
    // ---
    use super::*;

    /// WebAuthn / Passkeys configuration.
    ///
    /// These values define the relying party identity and security
    /// origin used during WebAuthn registration and authentication.
    #[derive(Debug, Clone)]
    pub struct WebAuthnConfig {
        /// Relying Party ID (typically a domain name).
        pub rp_id: String,

        /// Human-readable Relying Party name.
        pub rp_name: String,

        /// Fully-qualified origin (e.g. https://example.com).
        pub origin: String,
    }

    impl WebAuthnConfig {
        /// Builds a [`WebAuthnConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// WebAuthn configuration is considered security-critical
        /// and must be explicitly provided.
        pub fn from_env() -> Result<Self> {
            // ---
            let rp_id = required_env!("PASSKEY_RP_ID");
            let origin = required_env!("PASSKEY_ORIGIN");

            let rp_name =
                std::env::var("PASSKEY_RP_NAME").unwrap_or_else(|_| "Passkey Demo".to_string());

            Ok(Self {
                rp_id,
                rp_name,
                origin,
            })
        }

        /// The relying party identity handed to the ceremony coordinators.
        pub fn relying_party(&self) -> RelyingParty {
            // ---
            RelyingParty {
                id: self.rp_id.clone(),
                name: self.rp_name.clone(),
                origin: self.origin.clone(),
            }
        }
    }
}
pub use webauthn::WebAuthnConfig;

// ============================================================
// Server configuration
// ============================================================

mod server {
    /// Listener and observability settings. Everything here has a default.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// Socket address the HTTP listener binds to.
        pub bind_addr: String,

        /// `prom` for Prometheus metrics, anything else disables them.
        pub metrics_type: String,
    }

    impl ServerConfig {
        pub fn from_env() -> Self {
            // ---
            Self {
                bind_addr: std::env::var("PASSKEY_BIND_ADDR")
                    .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
                metrics_type: std::env::var("PASSKEY_METRICS_TYPE")
                    .unwrap_or_else(|_| "noop".to_string()),
            }
        }

        pub fn prometheus_enabled(&self) -> bool {
            self.metrics_type == "prom"
        }
    }
}
pub use server::ServerConfig;

// ============================================================
// Tests
// ============================================================
