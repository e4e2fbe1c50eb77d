//! Login flow orchestration
//!
//! `AuthFlow` drives the three operations of the login lifecycle
//! (start, callback, logout) plus the guard for protected routes.
//! It works on a `Session` value and the `IdentityProvider` seam only;
//! cookie and HTTP plumbing live in the route handlers.
//!
//! Per-session state machine:
//! anonymous -> (start_login) -> login pending
//! -> (handle_callback ok) -> authenticated
//! -> (handle_callback err) -> anonymous
//! authenticated -> (logout) -> anonymous

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;

use super::oauth::{Identity, IdentityProvider};
use super::session::Session;
use crate::error::AppError;

/// Query parameters the provider appends to the callback redirect
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Auth flow controller
#[derive(Clone)]
pub struct AuthFlow {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthFlow {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Begin a login round-trip.
    ///
    /// Stores a fresh state token in the session and returns the provider
    /// authorization URL to redirect to. A second call before the callback
    /// replaces the token; the older tab's callback then fails the state
    /// check and must restart login.
    pub fn start_login(&self, session: &mut Session) -> String {
        let state = generate_state();
        session.csrf_state = Some(state.clone());
        self.provider.authorization_url(&state)
    }

    /// Handle the provider's callback redirect.
    ///
    /// The stored state token is consumed on every path through this
    /// function, so a replayed callback always fails the state check.
    /// Token exchange is only reached after the state check passes.
    pub async fn handle_callback(
        &self,
        session: &mut Session,
        params: &CallbackParams,
    ) -> Result<(), AppError> {
        if params.error.is_some() {
            session.csrf_state = None;
            return Err(AppError::ProviderDenied);
        }

        let stored_state = session.csrf_state.take();
        match (stored_state.as_deref(), params.state.as_deref()) {
            (Some(stored), Some(received)) if stored == received => {}
            _ => return Err(AppError::CsrfMismatch),
        }

        // State proof succeeded but the provider sent no code: contract
        // violation on its side, same handling as a failed exchange.
        let code = params
            .code
            .as_deref()
            .ok_or_else(|| AppError::TokenExchangeFailed("authorization code missing".into()))?;

        let identity = self.provider.authenticate(code).await?;

        session.user_id = Some(identity.sub);
        session.email = identity.email;
        session.display_name = identity.name;
        session.logged_in_at = Some(Utc::now());
        Ok(())
    }

    /// Clear the session unconditionally. Idempotent.
    pub fn logout(&self, session: &mut Session) {
        session.clear();
    }

    /// Guard for protected routes.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` when no user is signed in.
    pub fn require_auth(&self, session: &Session) -> Result<Identity, AppError> {
        match &session.user_id {
            Some(user_id) => Ok(Identity {
                sub: user_id.clone(),
                email: session.email.clone(),
                name: session.display_name.clone(),
            }),
            None => Err(AppError::NotAuthenticated),
        }
    }
}

/// Generate an unguessable state token.
///
/// 32 random bytes, base64url-encoded: 256 bits of entropy against the
/// 128-bit minimum the flow requires.
fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
