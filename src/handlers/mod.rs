// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod authentication;
mod health;
mod http_metrics;
mod metrics;
mod registration;
mod root;
mod shared_types;

// Core handlers
pub use health::health_check;
pub use http_metrics::track_http_metrics;
pub use metrics::metrics_handler;
pub use root::root_handler;

// Passkey ceremony handlers
pub use authentication::{generate_authentication_options, verify_authentication};
pub use registration::{generate_registration_options, verify_registration};
