//! Page rendering
//!
//! Simple inline HTML pages; no templating engine.

use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};

/// Create the page router
///
/// Routes:
/// - GET / - Public landing page
/// - GET /protected/profile - Profile page (sign-in required)
pub fn page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing_page))
        .route("/protected/profile", get(profile_page))
}

/// GET /
///
/// Public landing page with a Google sign-in link, or a greeting when
/// already signed in.
async fn landing_page(MaybeUser(user): MaybeUser) -> impl IntoResponse {
    let body = match user {
        Some(identity) => {
            let name = identity.name.as_deref().unwrap_or(&identity.sub);
            let name = html_escape::encode_text(name);
            format!(
                r#"<p>Signed in as {name}.</p>
            <p><a href="/protected/profile">Profile</a> | <a href="/logout">Sign out</a></p>"#
            )
        }
        None => r#"<p>Welcome, guest.</p>
            <p><a href="/login">Sign in with Google</a></p>"#
            .to_string(),
    };

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Tidepool</title></head>
        <body>
            <h1>Tidepool</h1>
            {body}
        </body>
        </html>
    "#
    ))
}

/// GET /protected/profile
///
/// Renders the stored identity. The `CurrentUser` extractor redirects
/// anonymous visitors to `/login`.
async fn profile_page(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    let name = html_escape::encode_text(identity.name.as_deref().unwrap_or("(no name)"));
    let email = html_escape::encode_text(identity.email.as_deref().unwrap_or("(no email)"));
    let sub = html_escape::encode_text(&identity.sub);

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Profile - Tidepool</title></head>
        <body>
            <h1>Your profile</h1>
            <ul>
                <li>Name: {name}</li>
                <li>Email: {email}</li>
                <li>Subject: {sub}</li>
            </ul>
            <p><a href="/">Home</a> | <a href="/logout">Sign out</a></p>
        </body>
        </html>
    "#
    ))
}
