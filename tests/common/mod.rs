// Test helpers are intentionally partially used
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use passkey_relying_party::domain::{
    AssertionResponse, AttestationResponse, AuthenticationInfo, AuthenticationVerification,
    ChallengeOptions, Credential, CredentialStore, CredentialStorePtr, DeviceType,
    ExpectedCeremony, IssuedChallenge, MetricsPtr, RegistrationInfo, RegistrationOptionsRequest,
    RegistrationVerification, RelyingParty, User, Verifier, VerifierError,
};
use passkey_relying_party::{
    create_noop_metrics, create_router_with, InMemoryCredentialStore, InMemorySessionStore,
    RouterParts, SESSION_COOKIE,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use uuid::Uuid;

// ============================================================================
// Stub verifier
// ============================================================================

/// Verifier that trusts the client.
///
/// The issued state doubles as the challenge; a response whose
/// `clientChallenge` differs from the expected one is rejected.
pub struct StubVerifier {
    pub registration_verified: bool,
    pub authentication_verified: bool,
    pub credential_id: Vec<u8>,
    pub authentication_counter: u32,
}

impl Default for StubVerifier {
    fn default() -> Self {
        // ---
        Self {
            registration_verified: true,
            authentication_verified: true,
            credential_id: vec![0x01],
            authentication_counter: 0,
        }
    }
}

fn check_challenge(response: &Value, expected: &ExpectedCeremony) -> Result<(), VerifierError> {
    // ---
    match response.get("clientChallenge").and_then(Value::as_str) {
        Some(signed) if signed != expected.challenge => {
            Err(VerifierError("challenge mismatch".to_string()))
        }
        _ => Ok(()),
    }
}

impl Verifier for StubVerifier {
    // ---
    fn generate_registration_options(
        &self,
        request: &RegistrationOptionsRequest,
    ) -> Result<IssuedChallenge, VerifierError> {
        // ---
        let state = format!("reg:{}", Uuid::new_v4());
        Ok(IssuedChallenge {
            options: ChallengeOptions::new(json!({
                "publicKey": {
                    "challenge": state,
                    "rp": { "id": request.rp_id, "name": request.rp_name },
                    "user": {
                        "id": request.user_id.to_string(),
                        "name": request.user_name,
                        "displayName": request.user_display_name,
                    },
                }
            })),
            state,
        })
    }

    fn verify_registration_response(
        &self,
        response: &AttestationResponse,
        expected: &ExpectedCeremony,
    ) -> Result<RegistrationVerification, VerifierError> {
        // ---
        check_challenge(response.as_json(), expected)?;

        if !self.registration_verified {
            return Ok(RegistrationVerification {
                verified: false,
                registration_info: None,
            });
        }

        Ok(RegistrationVerification {
            verified: true,
            registration_info: Some(RegistrationInfo {
                credential_id: self.credential_id.clone(),
                public_key: b"stub-public-key".to_vec(),
                counter: 0,
                device_type: DeviceType::SingleDevice,
                backup_eligible: false,
                backed_up: false,
            }),
        })
    }

    fn generate_authentication_options(&self) -> Result<IssuedChallenge, VerifierError> {
        // ---
        let state = format!("auth:{}", Uuid::new_v4());
        Ok(IssuedChallenge {
            options: ChallengeOptions::new(json!({
                "publicKey": { "challenge": state, "userVerification": "preferred" }
            })),
            state,
        })
    }

    fn verify_authentication_response(
        &self,
        response: &AssertionResponse,
        expected: &ExpectedCeremony,
        credential: &Credential,
    ) -> Result<AuthenticationVerification, VerifierError> {
        // ---
        check_challenge(response.as_json(), expected)?;

        if !self.authentication_verified {
            return Ok(AuthenticationVerification {
                verified: false,
                authentication_info: None,
            });
        }

        Ok(AuthenticationVerification {
            verified: true,
            authentication_info: Some(AuthenticationInfo {
                credential_id: credential.id.clone(),
                new_counter: self.authentication_counter,
                user_verified: true,
                updated_public_key: None,
            }),
        })
    }
}

/// Credential store that fails every call, as if Redis were down.
pub struct UnavailableStore;

#[async_trait::async_trait]
impl CredentialStore for UnavailableStore {
    // ---
    async fn find_user_by_email(&self, _: &str) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }
    async fn find_user_by_id(&self, _: Uuid) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }
    async fn find_credential_by_id(&self, _: &[u8]) -> anyhow::Result<Option<(Uuid, Credential)>> {
        anyhow::bail!("connection refused")
    }
    async fn insert_user_if_absent(&self, _: User) -> anyhow::Result<User> {
        anyhow::bail!("connection refused")
    }
    async fn upsert_user(&self, _: &User) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
    async fn ping(&self) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}

// ============================================================================
// Router setup
// ============================================================================

pub fn test_relying_party() -> RelyingParty {
    // ---
    RelyingParty {
        id: "localhost".to_string(),
        name: "Test App".to_string(),
        origin: "http://localhost:8080".to_string(),
    }
}

/// Router over in-memory stores, plus a handle on the credential store.
pub fn test_router_with(
    verifier: StubVerifier,
    metrics: MetricsPtr,
) -> (Router, Arc<InMemoryCredentialStore>) {
    // ---
    let store = Arc::new(InMemoryCredentialStore::new());
    let router = create_router_with(RouterParts {
        store: store.clone(),
        sessions: Arc::new(InMemorySessionStore::new()),
        verifier: Arc::new(verifier),
        metrics,
        relying_party: test_relying_party(),
        challenge_ttl: Duration::from_secs(300),
    });

    (router, store)
}

/// Router over the given credential store and in-memory sessions.
pub fn router_over_store(store: CredentialStorePtr) -> Router {
    // ---
    create_router_with(RouterParts {
        store,
        sessions: Arc::new(InMemorySessionStore::new()),
        verifier: Arc::new(StubVerifier::default()),
        metrics: create_noop_metrics().unwrap(),
        relying_party: test_relying_party(),
        challenge_ttl: Duration::from_secs(300),
    })
}

pub fn test_router() -> (Router, Arc<InMemoryCredentialStore>) {
    // ---
    test_router_with(StubVerifier::default(), create_noop_metrics().unwrap())
}

// ============================================================================
// Request helpers
// ============================================================================

/// Builds a request, attaching the session cookie when one is given.
pub fn request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    // ---
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }

    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

/// Session token from the response's `Set-Cookie` header, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    // ---
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            value
                .strip_prefix(&format!("{SESSION_COOKIE}="))
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
}

pub async fn body_json(response: Response<Body>) -> Value {
    // ---
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    // ---
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// base64url form of a credential id, as a browser would send it.
pub fn b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

// ============================================================================
// Live server
// ============================================================================

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
}

impl TestServer {
    // ---
    pub async fn new(app: Router) -> Self {
        // --

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start
        sleep(Duration::from_millis(100)).await;

        let client = Client::new();

        Self { addr, client }
    }

    pub fn url(&self, path: &str) -> String {
        // ---
        format!("http://{}{}", self.addr, path)
    }
}
