//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Browser session data
///
/// Stored in a signed cookie. Starts out empty; `csrf_state` is present
/// only while a login round-trip is in flight, the user fields only after
/// a successful callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Provider-issued subject identifier (`sub` claim)
    #[serde(default)]
    pub user_id: Option<String>,
    /// Email from the provider
    #[serde(default)]
    pub email: Option<String>,
    /// Display name from the provider
    #[serde(default)]
    pub display_name: Option<String>,
    /// In-flight login state token; consumed exactly once on callback
    #[serde(default)]
    pub csrf_state: Option<String>,
    /// When the current login completed
    #[serde(default)]
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Reset to the empty (anonymous) state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload =
        serde_json::to_string(session).map_err(|e| AppError::Session(e.to_string()))?;

    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Session(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns error if signature is invalid or token is malformed
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(AppError::Session("malformed token".to_string()));
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Session(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Session("invalid signature encoding".to_string()))?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::Session("signature mismatch".to_string()))?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Session("invalid payload encoding".to_string()))?;

    let payload_str = String::from_utf8(payload_bytes)
        .map_err(|_| AppError::Session("invalid payload".to_string()))?;

    let session: Session = serde_json::from_str(&payload_str)
        .map_err(|_| AppError::Session("invalid payload".to_string()))?;

    Ok(session)
}

/// Decode the session cookie, falling back to a fresh empty session.
///
/// An absent, malformed, or tampered cookie is indistinguishable from a
/// first visit.
pub fn session_from_cookie(cookie: Option<&Cookie<'_>>, secret: &str) -> Session {
    match cookie {
        Some(cookie) => verify_session_token(cookie.value(), secret).unwrap_or_default(),
        None => Session::default(),
    }
}

/// Create the session cookie
pub fn session_cookie(
    token: String,
    max_age_seconds: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

/// Create removal cookie for the session
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-32-bytes-long!!!";

    fn authenticated_session() -> Session {
        Session {
            user_id: Some("u1".to_string()),
            email: Some("a@b.com".to_string()),
            display_name: Some("A B".to_string()),
            csrf_state: None,
            logged_in_at: Some(Utc::now()),
        }
    }

    #[test]
    fn token_round_trips() {
        let session = authenticated_session();
        let token = create_session_token(&session, SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = create_session_token(&authenticated_session(), SECRET).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();
        let mut tampered = payload.to_string();
        tampered.push('A');
        let tampered = format!("{tampered}.{signature}");

        assert!(verify_session_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_session_token(&authenticated_session(), SECRET).unwrap();
        assert!(verify_session_token(&token, "another-secret-key-32-bytes!!!!!").is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_session_token("not-a-token", SECRET).is_err());
        assert!(verify_session_token("a.b.c", SECRET).is_err());
        assert!(verify_session_token("", SECRET).is_err());
    }

    #[test]
    fn invalid_cookie_yields_fresh_session() {
        let cookie = Cookie::new(SESSION_COOKIE, "garbage");
        let session = session_from_cookie(Some(&cookie), SECRET);
        assert_eq!(session, Session::default());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn clear_resets_all_fields() {
        let mut session = authenticated_session();
        session.csrf_state = Some("abc".to_string());
        session.clear();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("token".to_string(), 3600, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }
}
