//! Session cookie handling.
//!
//! The browser holds a single opaque token (a UUID) in an HTTP-only cookie;
//! everything the ceremonies need is kept server-side under that token.

use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "passkey_session";

/// Returns the session token from the request cookie, if it holds a UUID.
pub(crate) fn current_token(cookies: &Cookies) -> Option<String> {
    // ---
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| Uuid::parse_str(token).is_ok())
}

/// Returns the current session token, issuing a fresh one when the request
/// carries none.
pub(crate) fn ensure_token(cookies: &Cookies) -> String {
    // ---
    if let Some(token) = current_token(cookies) {
        return token;
    }

    let token = Uuid::new_v4().to_string();
    let mut cookie = Cookie::new(SESSION_COOKIE, token.clone());
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);

    tracing::debug!("Issued new session cookie");
    token
}
