//! # mse-db
//!
//! Database layer for MedSynEval RS.
//!
//! This crate provides:
//!
//! - Connection pool management and the embedded schema migration
//! - Store traits, one per aggregate, with PostgreSQL repositories
//! - An in-memory store with the same semantics for tests and local runs
//!
//! ## Example
//!
//! ```ignore
//! use mse_db::{Database, Stores};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let stores = Stores::postgres(db.pool().clone());
//! let clinician = stores.clinicians.find_by_username("doctor1").await?;
//! ```

pub mod assignments;
pub mod clinicians;
pub mod evaluations;
pub mod image_sets;
pub mod invitations;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod store;

// Re-exports
pub use assignments::AssignmentRepository;
pub use clinicians::ClinicianRepository;
pub use evaluations::EvaluationRepository;
pub use image_sets::ImageSetRepository;
pub use invitations::InvitationRepository;
pub use memory::MemoryStore;
pub use pool::{Database, PoolStats};
pub use repository::{RepositoryError, RepositoryResult};
pub use store::{
    AssignmentStore, ClinicianStore, EvaluationFilter, EvaluationStore, ImageSetStore,
    InvitationStore, Stores,
};
