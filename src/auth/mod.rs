//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Signed access tokens
//! - Request extractors and middleware

mod middleware;
pub mod password;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser, RequireAdmin, TOKEN_COOKIE, require_auth};
pub use session::{Session, create_session_token, verify_session_token};
