//! # mse-models
//!
//! Domain models for MedSynEval RS.
//!
//! Each struct maps to a database table (or a read-only join over several)
//! and implements the core traits from `mse-core`.

pub use mse_core::traits::{Entity, Id, Identifiable, Timestamped};

pub mod assignment;
pub mod clinician;
pub mod evaluation;
pub mod image_set;
pub mod invitation;

pub use assignment::{Assignment, AssignmentProgress, NewAssignment};
pub use clinician::{Clinician, NewClinician, ProfileUpdate, RegistrationForm};
pub use evaluation::{Evaluation, EvaluationDetail, EvaluationSubmission, NewEvaluation};
pub use image_set::{ImageRecord, ImageSet, ImageSetSummary, NewImage, NewImageSet};
pub use invitation::Invitation;
