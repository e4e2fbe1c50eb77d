//! Login flow routes
//!
//! Routes:
//! - GET /login - Start the login round-trip (redirect to Google)
//! - GET /callback - OAuth callback
//! - GET /logout - Clear the session
//! - GET /login/failed - Generic failure page

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::flow::CallbackParams;
use super::session::{
    Session, clear_session_cookie, create_session_token, session_cookie, session_from_cookie,
};
use crate::AppState;
use crate::error::AppError;

/// Create the authentication router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/login/failed", get(login_failed))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

fn load_session(jar: &CookieJar, state: &AppState) -> Session {
    session_from_cookie(
        jar.get(super::session::SESSION_COOKIE),
        &state.config.session.secret,
    )
}

fn store_session(
    jar: CookieJar,
    session: &Session,
    state: &AppState,
) -> Result<CookieJar, AppError> {
    let token = create_session_token(session, &state.config.session.secret)?;
    Ok(jar.add(session_cookie(
        token,
        state.config.session.max_age,
        state.config.should_use_secure_cookies(),
    )))
}

/// GET /login
///
/// Stores a fresh state token in the session and redirects to the
/// provider's authorization page.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let mut session = load_session(&jar, &state);
    let authorize_url = state.flow.start_login(&mut session);
    let jar = store_session(jar, &session, &state)?;

    tracing::debug!("Login started, redirecting to provider");
    Ok((jar, Redirect::to(&authorize_url)))
}

/// GET /callback
///
/// Handles the provider redirect. The cleared state token must reach the
/// browser even when the callback fails, so both arms set the cookie and
/// redirect; failures use fixed reason codes, never provider text.
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut session = load_session(&jar, &state);

    let outcome = state.flow.handle_callback(&mut session, &params).await;

    let jar = match store_session(jar, &session, &state) {
        Ok(jar) => jar,
        Err(error) => return error.into_response(),
    };

    match outcome {
        Ok(()) => {
            tracing::info!(user_id = ?session.user_id, "Login successful");
            (jar, Redirect::to("/protected/profile")).into_response()
        }
        Err(error) => {
            tracing::warn!(reason = error.reason_code(), "Login failed");
            let reason = urlencoding::encode(error.reason_code()).into_owned();
            (jar, Redirect::to(&format!("/login/failed?reason={reason}"))).into_response()
        }
    }
}

/// GET /logout
///
/// Clears the session cookie and redirects home. Idempotent.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.add(clear_session_cookie()), Redirect::to("/"))
}

#[derive(Debug, Default, Deserialize)]
struct FailureParams {
    reason: Option<String>,
}

/// GET /login/failed
///
/// Generic failure page. A retry link is only offered for a failed token
/// exchange, which is plausibly transient.
async fn login_failed(Query(params): Query<FailureParams>) -> impl IntoResponse {
    let retry = matches!(params.reason.as_deref(), Some("token_exchange_failed"));
    let retry_link = if retry {
        r#"<p><a href="/login">Try again</a></p>"#
    } else {
        r#"<p><a href="/">Back to home</a></p>"#
    };

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Sign-in failed - Tidepool</title></head>
        <body>
            <h1>Sign-in failed</h1>
            <p>We could not sign you in.</p>
            {retry_link}
        </body>
        </html>
    "#
    ))
}
