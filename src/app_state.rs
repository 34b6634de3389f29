//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` holds the
//! ceremony coordinators together with the stores and metrics they share.
//!
//! The state is designed to be cheaply cloneable (using `Arc` internally)
//! so it can be passed efficiently to each request handler without copying
//! any resources.

use crate::domain::{
    AuthenticationCoordinator, ChallengeSession, CredentialStorePtr, MetricsPtr,
    RegistrationCoordinator, SessionStorePtr,
};
use std::sync::Arc;

/// Shared application state passed to all Axum handlers.
///
/// This struct serves as the Dependency Injection container for the application.
/// Handlers depend on the `CredentialStore` and `SessionStore` abstractions,
/// never on Redis directly, so the router can be driven by in-memory fakes.
///
/// # Lifecycle
///
/// 1. Created once in `create_router_with()` during application startup
/// 2. Attached to the Axum router via `.with_state(app_state)`
/// 3. Cloned automatically by Axum for each incoming HTTP request
/// 4. Handlers extract via `State(state): State<AppState>`
#[derive(Clone)]
pub(crate) struct AppState {
    /// Metrics implementation for recording application events.
    ///
    /// Either Prometheus-backed (production) or no-op (testing/development).
    metrics: MetricsPtr,

    /// Durable users and credentials; used directly only by the health check.
    store: CredentialStorePtr,

    /// Per-session ceremony state, keyed by the session cookie token.
    sessions: SessionStorePtr,

    registration: Arc<RegistrationCoordinator>,
    authentication: Arc<AuthenticationCoordinator>,
}

impl AppState {
    // ---

    pub fn new(
        metrics: MetricsPtr,
        store: CredentialStorePtr,
        sessions: SessionStorePtr,
        registration: Arc<RegistrationCoordinator>,
        authentication: Arc<AuthenticationCoordinator>,
    ) -> Self {
        // ---
        AppState {
            metrics,
            store,
            sessions,
            registration,
            authentication,
        }
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }

    /// Get a reference to the credential store.
    pub(crate) fn store(&self) -> &CredentialStorePtr {
        // ---
        &self.store
    }

    pub(crate) fn registration(&self) -> &RegistrationCoordinator {
        // ---
        &self.registration
    }

    pub(crate) fn authentication(&self) -> &AuthenticationCoordinator {
        // ---
        &self.authentication
    }

    /// Binds the session store to one session token.
    pub(crate) fn challenge_session(&self, token: String) -> ChallengeSession {
        // ---
        ChallengeSession::new(self.sessions.clone(), token)
    }
}
