//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub google: GoogleOAuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "demo.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the site
    ///
    /// # Returns
    /// Full URL like "https://demo.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Google OAuth2 configuration
///
/// The endpoint URLs default to Google's published endpoints and only
/// need overriding in tests or against a mock provider.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    /// OAuth2 client ID from the Google Cloud console
    pub client_id: String,
    /// OAuth2 client secret (never logged, never sent to the browser)
    pub client_secret: String,
    /// Authorization endpoint
    pub auth_url: Url,
    /// Token exchange endpoint
    pub token_url: Url,
    /// OpenID Connect userinfo endpoint
    pub userinfo_url: Url,
    /// Callback path registered with the provider (e.g., "/callback")
    pub redirect_path: String,
    /// Requested scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl GoogleOAuthConfig {
    /// Full redirect URI as registered with the provider.
    ///
    /// Must exactly match the console registration; the provider rejects
    /// the authorization request otherwise.
    pub fn redirect_url(&self, server: &ServerConfig) -> String {
        format!("{}{}", server.base_url(), self.redirect_path)
    }
}

fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "email".into(), "profile".into()]
}

/// Session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie signing key (32+ bytes)
    pub secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub max_age: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TIDEPOOL_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default(
                "google.auth_url",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "google.userinfo_url",
                "https://openidconnect.googleapis.com/v1/userinfo",
            )?
            .set_default("google.redirect_path", "/callback")?
            .set_default("session.max_age", 604800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (TIDEPOOL_*)
            .add_source(
                Environment::with_prefix("TIDEPOOL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.session.secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "session.max_age must be greater than 0".to_string(),
            ));
        }

        if self.google.client_id.trim().is_empty() || self.google.client_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "google.client_id and google.client_secret are required".to_string(),
            ));
        }

        if !self.google.redirect_path.starts_with('/') {
            return Err(crate::error::AppError::Config(
                "google.redirect_path must start with '/'".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost:8080".to_string(),
                protocol: "http".to_string(),
            },
            google: GoogleOAuthConfig {
                client_id: "google-client-id".to_string(),
                client_secret: "google-client-secret".to_string(),
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth"
                    .parse()
                    .unwrap(),
                token_url: "https://oauth2.googleapis.com/token".parse().unwrap(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo"
                    .parse()
                    .unwrap(),
                redirect_path: "/callback".to_string(),
                scopes: default_scopes(),
            },
            session: SessionConfig {
                secret: "x".repeat(32),
                max_age: 604_800,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.session.secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("session.secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "demo.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_empty_client_credentials() {
        let mut config = valid_config();
        config.google.client_secret = "  ".to_string();

        let error = config
            .validate()
            .expect_err("blank client secret must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("google.client_id")
        ));
    }

    #[test]
    fn redirect_url_joins_base_url_and_path() {
        let config = valid_config();
        assert_eq!(
            config.google.redirect_url(&config.server),
            "http://localhost:8080/callback"
        );
    }
}
