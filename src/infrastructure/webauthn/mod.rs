//! WebAuthn configuration and verifier.
//!
//! This module provides a factory function for creating a WebAuthn instance
//! configured for the application's relying party identity, and the
//! [`WebauthnVerifier`] that exposes it through the domain `Verifier` trait.

mod verifier;

pub use verifier::WebauthnVerifier;

use std::str::FromStr;

use crate::config::WebAuthnConfig;
use anyhow::Result;
use reqwest::Url;
use webauthn_rs::{Webauthn, WebauthnBuilder};

/// Creates a configured WebAuthn instance from application config.
///
/// # Parameters
/// - `config`: WebAuthn configuration (RP ID, origin, etc.)
///
/// # Returns
/// A configured `Webauthn` instance ready for registration/authentication flows.
///
/// # Errors
/// Returns an error if the WebAuthn builder fails to construct a valid instance.
/// This typically happens if the origin URL or RP ID are malformed.
pub fn create_webauthn(config: &WebAuthnConfig) -> Result<Webauthn> {
    // ---
    tracing::debug!("Creating with config:{:?}", config);

    let url = Url::from_str(config.origin.as_str())?;
    let builder = WebauthnBuilder::new(&config.rp_id, &url)?;
    let webauthn = builder.rp_name(&config.rp_name).build()?;

    Ok(webauthn)
}

/// Creates the webauthn-rs backed verifier for the configured relying party.
pub fn create_webauthn_verifier(config: &WebAuthnConfig) -> Result<WebauthnVerifier> {
    // ---
    let webauthn = create_webauthn(config)?;
    Ok(WebauthnVerifier::new(webauthn, config.relying_party()))
}
