//! Error types for Tidepool
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse`. Login-flow failures redirect
//! rather than render error bodies; everything else maps to a
//! status code with a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// User declined consent or the provider returned an error code
    #[error("Provider denied the login attempt")]
    ProviderDenied,

    /// The callback state parameter was absent or did not match the
    /// session's stored value. Treated as a potential attack, not a
    /// transient fault.
    #[error("OAuth state mismatch")]
    CsrfMismatch,

    /// Network/timeout/invalid response from the provider's token or
    /// userinfo endpoint
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Guard failure on a protected route
    #[error("Authentication required")]
    NotAuthenticated,

    /// Session cookie could not be signed or encoded (500)
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Fixed machine-readable code for the login failure page.
    ///
    /// Only these codes ever reach a redirect URL; provider-supplied
    /// error text is never reflected back to the browser.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AppError::ProviderDenied => "provider_denied",
            AppError::CsrfMismatch => "state_mismatch",
            AppError::TokenExchangeFailed(_) => "token_exchange_failed",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::Session(_) => "session",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Login-flow errors are terminal for the request and redirect:
    /// `NotAuthenticated` always goes to `/login`, the rest to the
    /// generic failure page.
    fn into_response(self) -> Response {
        use axum::Json;

        match &self {
            AppError::NotAuthenticated => return Redirect::to("/login").into_response(),
            AppError::ProviderDenied
            | AppError::CsrfMismatch
            | AppError::TokenExchangeFailed(_) => {
                let reason = self.reason_code();
                return Redirect::to(&format!("/login/failed?reason={reason}")).into_response();
            }
            _ => {}
        }

        let (status, error_message) = match &self {
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error".to_string(),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            _ => unreachable!("redirect variants handled above"),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
