//! Common test utilities for E2E tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::async_trait;
use tidepool::auth::{Identity, IdentityProvider};
use tidepool::error::AppError;
use tidepool::{AppState, config};
use tokio::net::TcpListener;

/// Stub identity provider for E2E tests
///
/// Records how many times the token exchange was invoked and can be
/// switched into a failing mode.
pub struct StubProvider {
    exchanges: AtomicUsize,
    fail_exchange: AtomicBool,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            exchanges: AtomicUsize::new(0),
            fail_exchange: AtomicBool::new(false),
        }
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn fail_next_exchanges(&self) {
        self.fail_exchange.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://provider.test/authorize?response_type=code&state={state}")
    }

    async fn authenticate(&self, code: &str) -> Result<Identity, AppError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(AppError::TokenExchangeFailed("stub failure".to_string()));
        }
        if code != "xyz" {
            return Err(AppError::TokenExchangeFailed("unknown code".to_string()));
        }

        Ok(Identity {
            sub: "u1".to_string(),
            email: Some("a@b.com".to_string()),
            name: Some("A B".to_string()),
        })
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub provider: Arc<StubProvider>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by the stub provider
    pub async fn new() -> Self {
        // Create test configuration (http on localhost: insecure cookies,
        // so the reqwest cookie store accepts them)
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            google: config::GoogleOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                auth_url: "https://provider.test/authorize".parse().unwrap(),
                token_url: "https://provider.test/token".parse().unwrap(),
                userinfo_url: "https://provider.test/userinfo".parse().unwrap(),
                redirect_path: "/callback".to_string(),
                scopes: vec!["openid".into(), "email".into(), "profile".into()],
            },
            session: config::SessionConfig {
                secret: "test-secret-key-32-bytes-long!!!".to_string(),
                max_age: 604800,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let provider = Arc::new(StubProvider::new());
        let state = AppState::with_provider(config, provider.clone());

        // Cookie-store client that follows no redirects, so tests can
        // assert each hop of the flow
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = tidepool::build_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Start a login and return the state parameter the server generated
    pub async fn start_login(&self) -> String {
        let response = self
            .client
            .get(self.url("/login"))
            .send()
            .await
            .expect("login request succeeds");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        extract_state_param(location)
    }
}

/// Pull the `state` query parameter out of an authorization URL
pub fn extract_state_param(location: &str) -> String {
    let url = url::Url::parse(location).expect("valid authorization URL");
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state parameter present")
}
