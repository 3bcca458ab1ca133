//! # mse-services
//!
//! Business logic services for MedSynEval RS.
//!
//! Services sit between the HTTP handlers (or the CLI) and the stores.
//! They run the contracts, enforce who may do what, and translate store
//! errors into [`MseError`](mse_core::MseError). Every service holds a
//! cloned [`Stores`](mse_db::Stores) bundle, so they are cheap to build
//! per request.

pub mod assignments;
pub mod authentication;
pub mod evaluations;
pub mod loader;
pub mod profile;
pub mod registration;
pub mod reporting;

pub use assignments::AssignmentService;
pub use authentication::AuthenticationService;
pub use evaluations::{EvaluationService, NextImage};
pub use loader::{
    scan_folder, FolderScan, ImageSetLoader, LoadError, LoadOptions, LoadReport, ScannedImage,
    SkippedFile,
};
pub use profile::ProfileService;
pub use registration::{
    InvitationService, RegistrationService, SuperuserParams, TokenCheck,
    MAX_INVITATIONS_PER_REQUEST,
};
pub use reporting::ReportingService;

use mse_core::{MseError, MseResult, UserContext};

/// Reject callers that are not administrators
pub fn require_superuser<U: UserContext>(user: &U) -> MseResult<()> {
    if user.is_superuser() {
        Ok(())
    } else {
        Err(MseError::forbidden("Administrator access required"))
    }
}
