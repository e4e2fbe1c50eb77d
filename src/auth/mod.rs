//! Google OAuth authentication
//!
//! Handles:
//! - The login flow (start, callback, logout)
//! - Session management
//! - Extractors for protected routes

pub mod extract;
pub mod flow;
pub mod oauth;
pub mod session;
mod routes;

pub use extract::{CurrentUser, MaybeUser};
pub use flow::{AuthFlow, CallbackParams};
pub use oauth::{GoogleClient, Identity, IdentityProvider};
pub use routes::auth_router;
pub use session::{Session, create_session_token, verify_session_token};
