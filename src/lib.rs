//! Tidepool - a minimal demo site with Sign in with Google
//!
//! # Architecture
//!
//! ```text
//! browser -> Route Layer (axum) -> AuthFlow -> IdentityProvider (Google)
//!                 |                    |
//!           page rendering      signed session cookie
//! ```
//!
//! # Modules
//!
//! - `auth`: login flow, session cookies, extractors
//! - `pages`: landing and profile pages
//! - `config`: configuration management
//! - `error`: error types

pub mod auth;
pub mod config;
pub mod error;
pub mod pages;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned per request; holds only immutable configuration and the
/// provider client behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Login flow controller
    pub flow: auth::AuthFlow,
}

impl AppState {
    /// Initialize application state with the Google provider.
    ///
    /// # Errors
    /// Returns error if the provider HTTP client cannot be built.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let provider = auth::GoogleClient::new(&config.google, &config.server)?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Initialize application state with an explicit provider.
    ///
    /// Used by tests to substitute a stub identity provider.
    pub fn with_provider(
        config: config::AppConfig,
        provider: Arc<dyn auth::IdentityProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            flow: auth::AuthFlow::new(provider),
        }
    }
}

/// Build the axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(pages::page_router())
        .merge(auth::auth_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
