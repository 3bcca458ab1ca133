//! # mse-contracts
//!
//! Contract validation for MedSynEval RS.
//!
//! Contracts validate input before create/update operations and check
//! that the caller is allowed to perform them. They never touch the
//! database; anything they need from it is passed in by the service.

pub mod assignments;
pub mod base;
pub mod clinicians;
pub mod evaluations;

pub use base::*;
