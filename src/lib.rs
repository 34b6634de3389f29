// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;

use domain::{
    AuthenticationCoordinator, CredentialStorePtr, MetricsPtr, RegistrationCoordinator,
    RelyingParty, SessionStorePtr, VerifierPtr,
};
use handlers::{
    generate_authentication_options, generate_registration_options, health_check,
    metrics_handler, root_handler, track_http_metrics, verify_authentication,
    verify_registration,
};

// Public exports (visible outside this module)
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod infrastructure;
mod session;

// Hoist up only the public symbol(s)
pub use session::SESSION_COOKIE;

pub use config::*;

// Publicly expose the infrastructure creation functions and stores
pub use infrastructure::{
    create_noop_metrics, // ---
    create_prom_metrics,
    create_webauthn,
    create_webauthn_verifier,
    InMemoryCredentialStore,
    InMemorySessionStore,
    RedisCredentialStore,
    RedisSessionStore,
    WebauthnVerifier,
};

/// Collaborators the router is assembled from.
///
/// `create_router()` builds these from the environment; tests build them
/// from in-memory stores and a stub verifier.
pub struct RouterParts {
    pub store: CredentialStorePtr,
    pub sessions: SessionStorePtr,
    pub verifier: VerifierPtr,
    pub metrics: MetricsPtr,
    pub relying_party: RelyingParty,
    pub challenge_ttl: Duration,
}

/// Build the HTTP router with every collaborator determined by environment variables.
pub fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    let metrics = if config.server.prometheus_enabled() {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    tracing_subscriber::fmt::try_init().ok(); // Ignores if already initialized

    // Create infrastructure dependencies
    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let store = Arc::new(RedisCredentialStore::new(redis_client.clone()));
    let sessions = Arc::new(RedisSessionStore::new(
        redis_client,
        config.redis.session_ttl,
    ));
    let verifier = Arc::new(create_webauthn_verifier(&config.webauthn)?);

    tracing::info!(
        "Relying party {} at {}",
        config.webauthn.rp_id,
        config.webauthn.origin
    );

    Ok(create_router_with(RouterParts {
        store,
        sessions,
        verifier,
        metrics,
        relying_party: config.webauthn.relying_party(),
        challenge_ttl: config.redis.challenge_ttl,
    }))
}

/// Build the HTTP router around the given collaborators.
pub fn create_router_with(parts: RouterParts) -> Router {
    // ---
    let registration = Arc::new(RegistrationCoordinator::new(
        parts.store.clone(),
        parts.verifier.clone(),
        parts.relying_party.clone(),
        parts.challenge_ttl,
    ));
    let authentication = Arc::new(AuthenticationCoordinator::new(
        parts.store.clone(),
        parts.verifier,
        parts.relying_party,
        parts.challenge_ttl,
    ));

    // Build application state with all dependencies
    let app_state = AppState::new(
        parts.metrics,
        parts.store,
        parts.sessions,
        registration,
        authentication,
    );

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/generate-registration-options",
            post(generate_registration_options),
        )
        .route("/verify-registration", post(verify_registration))
        .route(
            "/generate-authentication-options",
            get(generate_authentication_options),
        )
        .route("/verify-authentication", post(verify_authentication))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_http_metrics,
        ))
        .layer(CookieManagerLayer::new())
        .with_state(app_state)
}
