//! # mse-auth
//!
//! Authentication for MedSynEval RS.
//!
//! ## Features
//!
//! - Argon2 password hashing
//! - Server-side sessions keyed by a random cookie value
//! - Request-scoped `CurrentUser` identity

pub mod cookie;
pub mod password;
pub mod permissions;
pub mod session;

pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::CurrentUser;
pub use cookie::{extract_session_id, CookieConfig, SameSite, SESSION_COOKIE_NAME};
pub use session::{MemorySessionStore, Session, SessionError, SessionStore};
