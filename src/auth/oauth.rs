//! Google OAuth2 client
//!
//! Implements the application side of the authorization-code flow:
//! authorization URL construction, code-for-token exchange, and the
//! userinfo fetch. Token cryptography and claim verification stay on
//! Google's side of the wire.

use axum::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::{GoogleOAuthConfig, ServerConfig};
use crate::error::AppError;

/// Bounded timeout for token exchange and userinfo requests
const PROVIDER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Verified claims returned by the provider.
///
/// Read-only input; copied into the session on a successful login and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Opaque provider-issued subject identifier
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Token response from the provider's token endpoint
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    #[serde(default)]
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// Identity provider seam for the auth flow.
///
/// `GoogleClient` is the production implementation; tests substitute a
/// stub that records whether the exchange was invoked.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the provider authorization URL embedding the state token.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens and fetch the identity.
    async fn authenticate(&self, code: &str) -> Result<Identity, AppError>;
}

/// OAuth2 client for Google sign-in
pub struct GoogleClient {
    config: GoogleOAuthConfig,
    redirect_url: String,
    http: reqwest::Client,
}

impl GoogleClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &GoogleOAuthConfig, server: &ServerConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("Tidepool/0.1.0")
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            redirect_url: config.redirect_url(server),
            config: config.clone(),
            http,
        })
    }

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(e.to_string()))?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(e.to_string()))
    }

    /// Fetch identity claims using an access token.
    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, AppError> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(e.to_string()))?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        response
            .json::<Identity>()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(e.to_string()))
    }

    /// Checks HTTP response status; the body never reaches the browser.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        Err(AppError::TokenExchangeFailed(format!(
            "{operation} returned status {status}"
        )))
    }
}

#[async_trait]
impl IdentityProvider for GoogleClient {
    fn authorization_url(&self, state: &str) -> String {
        let scope = self.config.scopes.join(" ");

        let mut url: Url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("state", state)
            .append_pair("scope", &scope);

        url.into()
    }

    async fn authenticate(&self, code: &str) -> Result<Identity, AppError> {
        let tokens = self.exchange_code(code).await?;
        self.fetch_identity(&tokens.access_token).await
    }
}
