//! In-process stores.
//!
//! Used by tests in place of Redis and handy for running the service
//! locally without any backing services. State lives only as long as the
//! process.

mod credential_store;
mod session_store;

pub use credential_store::InMemoryCredentialStore;
pub use session_store::InMemorySessionStore;
