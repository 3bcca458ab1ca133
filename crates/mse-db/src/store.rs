//! Store traits
//!
//! Services depend on these traits rather than on a concrete database so the
//! same code runs against PostgreSQL and the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mse_core::traits::Id;
use mse_models::{
    Assignment, Clinician, Evaluation, EvaluationDetail, ImageRecord, ImageSet, ImageSetSummary,
    Invitation, NewAssignment, NewClinician, NewEvaluation, NewImage, NewImageSet, ProfileUpdate,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::memory::MemoryStore;
use crate::repository::RepositoryResult;
use crate::{
    AssignmentRepository, ClinicianRepository, EvaluationRepository, ImageSetRepository,
    InvitationRepository,
};

#[async_trait]
pub trait ClinicianStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Clinician>>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Clinician>>;

    /// All clinicians ordered by username
    async fn list(&self) -> RepositoryResult<Vec<Clinician>>;

    /// Insert a clinician; `Conflict` when the username is taken
    async fn create(&self, clinician: NewClinician) -> RepositoryResult<Clinician>;

    async fn update_profile(&self, id: Id, update: &ProfileUpdate) -> RepositoryResult<Clinician>;

    async fn count(&self) -> RepositoryResult<i64>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn create(&self, token: Uuid) -> RepositoryResult<Invitation>;

    async fn find_by_token(&self, token: Uuid) -> RepositoryResult<Option<Invitation>>;

    /// Newest first
    async fn list(&self) -> RepositoryResult<Vec<Invitation>>;

    /// Consume `token` and create the clinician in one atomic step.
    ///
    /// Returns `Ok(None)` when the token is unknown or already used. A
    /// username conflict leaves the token unused.
    async fn redeem(
        &self,
        token: Uuid,
        clinician: NewClinician,
    ) -> RepositoryResult<Option<Clinician>>;
}

#[async_trait]
pub trait ImageSetStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ImageSet>>;

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ImageSet>>;

    /// Sets with per-kind image counts, newest first
    async fn list_summaries(&self) -> RepositoryResult<Vec<ImageSetSummary>>;

    /// Insert a set and all its images in one transaction.
    ///
    /// `Conflict` when the name is taken; nothing is persisted on error.
    async fn create_with_images(
        &self,
        image_set: NewImageSet,
        images: Vec<NewImage>,
    ) -> RepositoryResult<ImageSet>;

    /// Images of a set ordered by id
    async fn images_for_set(&self, image_set_id: Id) -> RepositoryResult<Vec<ImageRecord>>;

    async fn find_image(&self, id: Id) -> RepositoryResult<Option<ImageRecord>>;

    async fn find_image_by_path(&self, path: &str) -> RepositoryResult<Option<ImageRecord>>;

    async fn count_images(&self) -> RepositoryResult<i64>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Insert an assignment and its image subset; `Conflict` on a duplicate pair
    async fn create(&self, assignment: NewAssignment) -> RepositoryResult<Assignment>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Assignment>>;

    /// All assignments ordered by id
    async fn list(&self) -> RepositoryResult<Vec<Assignment>>;

    async fn for_clinician(&self, clinician_id: Id) -> RepositoryResult<Vec<Assignment>>;

    /// Explicit image subset; empty means the whole set
    async fn image_subset(&self, assignment_id: Id) -> RepositoryResult<Vec<Id>>;

    /// Set the completed flag once; later calls keep the first timestamp
    async fn mark_completed(&self, assignment_id: Id, at: DateTime<Utc>) -> RepositoryResult<()>;
}

/// Selection of evaluation rows for reporting
#[derive(Debug, Clone, Default)]
pub struct EvaluationFilter {
    pub clinician_id: Option<Id>,
    pub ids: Option<Vec<Id>>,
}

impl EvaluationFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_clinician(clinician_id: Id) -> Self {
        Self {
            clinician_id: Some(clinician_id),
            ids: None,
        }
    }

    pub fn with_ids(ids: Vec<Id>) -> Self {
        Self {
            clinician_id: None,
            ids: Some(ids),
        }
    }

    pub fn matches(&self, detail: &EvaluationDetail) -> bool {
        self.clinician_id
            .map_or(true, |id| detail.clinician_id == id)
            && self
                .ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&detail.evaluation_id))
    }
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Insert an evaluation; `Conflict` when the pair was already evaluated
    async fn create(&self, evaluation: NewEvaluation) -> RepositoryResult<Evaluation>;

    async fn evaluated_image_ids(&self, clinician_id: Id) -> RepositoryResult<Vec<Id>>;

    /// Evaluations joined with ground truth, ordered by evaluation id
    async fn details(&self, filter: &EvaluationFilter) -> RepositoryResult<Vec<EvaluationDetail>>;

    async fn count(&self) -> RepositoryResult<i64>;
}

/// Bundle of every store, shared across handlers and services
#[derive(Clone)]
pub struct Stores {
    pub clinicians: Arc<dyn ClinicianStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub image_sets: Arc<dyn ImageSetStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub evaluations: Arc<dyn EvaluationStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            clinicians: Arc::new(ClinicianRepository::new(pool.clone())),
            invitations: Arc::new(InvitationRepository::new(pool.clone())),
            image_sets: Arc::new(ImageSetRepository::new(pool.clone())),
            assignments: Arc::new(AssignmentRepository::new(pool.clone())),
            evaluations: Arc::new(EvaluationRepository::new(pool)),
        }
    }

    /// Fresh in-memory stores sharing one set of tables
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            clinicians: store.clone(),
            invitations: store.clone(),
            image_sets: store.clone(),
            assignments: store.clone(),
            evaluations: store,
        }
    }
}
