//! Session extractors
//!
//! Pull the signed session cookie out of a request and hand handlers
//! either the verified identity or the raw session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::oauth::Identity;
use super::session::{SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

fn session_from_headers(headers: &HeaderMap, secret: &str) -> Session {
    let jar = CookieJar::from_headers(headers);
    match jar.get(SESSION_COOKIE) {
        Some(cookie) => verify_session_token(cookie.value(), secret).unwrap_or_default(),
        None => Session::default(),
    }
}

/// Extractor for the current authenticated user
///
/// Rejects with `NotAuthenticated`, which redirects to `/login`.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", identity.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session = session_from_headers(&parts.headers, &state.config.session.secret);
        let identity = state.flow.require_auth(&session)?;
        Ok(CurrentUser(identity))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of redirecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session = session_from_headers(&parts.headers, &state.config.session.secret);
        Ok(MaybeUser(state.flow.require_auth(&session).ok()))
    }
}
