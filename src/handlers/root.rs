use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Passkey relying party
Version: {version}

Available endpoints:
  - POST   /generate-registration-options   - Start registering a passkey ({{email, name}})
  - POST   /verify-registration             - Finish registration with the attestation
  - GET    /generate-authentication-options - Start a username-less login
  - POST   /verify-authentication           - Finish login with the assertion
  - GET    /health                          - Light health check
  - GET    /health?mode=full                - Full health check (includes the credential store)
  - GET    /metrics                         - Prometheus metrics
"#
    )
}
