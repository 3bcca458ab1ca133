//! # mse-api
//!
//! HTTP handlers for MedSynEval RS.
//!
//! JSON in, JSON out. Clinicians are identified by the `mse_session`
//! cookie; admin routes redirect anyone else to the login page.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, AuthenticatedUser, SuperUser};
pub use routes::router;
