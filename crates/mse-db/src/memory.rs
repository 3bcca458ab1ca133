//! In-memory store
//!
//! Implements every store trait over a single set of tables behind one lock,
//! so multi-table operations (token redemption, set loading) stay atomic.
//! Used by tests and for running the server without PostgreSQL.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mse_core::traits::Id;
use mse_models::{
    Assignment, Clinician, Evaluation, EvaluationDetail, ImageRecord, ImageSet, ImageSetSummary,
    Invitation, NewAssignment, NewClinician, NewEvaluation, NewImage, NewImageSet, ProfileUpdate,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::assignments::DUPLICATE_ASSIGNMENT;
use crate::clinicians::USERNAME_TAKEN;
use crate::evaluations::ALREADY_EVALUATED;
use crate::image_sets::duplicate_name_message;
use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{
    AssignmentStore, ClinicianStore, EvaluationFilter, EvaluationStore, ImageSetStore,
    InvitationStore,
};

#[derive(Default)]
struct Tables {
    next_id: Id,
    clinicians: BTreeMap<Id, Clinician>,
    invitations: BTreeMap<Id, Invitation>,
    image_sets: BTreeMap<Id, ImageSet>,
    images: BTreeMap<Id, ImageRecord>,
    assignments: BTreeMap<Id, Assignment>,
    assignment_images: BTreeMap<Id, Vec<Id>>,
    evaluations: BTreeMap<Id, Evaluation>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn insert_clinician(&mut self, new: NewClinician) -> RepositoryResult<Clinician> {
        if self
            .clinicians
            .values()
            .any(|c| c.username == new.username)
        {
            return Err(RepositoryError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let now = Utc::now();
        let clinician = Clinician {
            id: self.next_id(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            title: new.title,
            workplace: new.workplace,
            years_experience: new.years_experience,
            is_superuser: new.is_superuser,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.clinicians.insert(clinician.id, clinician.clone());
        Ok(clinician)
    }
}

/// In-memory implementation of all stores
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicianStore for MemoryStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Clinician>> {
        Ok(self.tables.read().await.clinicians.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Clinician>> {
        let tables = self.tables.read().await;
        Ok(tables
            .clinicians
            .values()
            .find(|c| c.username == username)
            .cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Clinician>> {
        let tables = self.tables.read().await;
        let mut clinicians: Vec<Clinician> = tables.clinicians.values().cloned().collect();
        clinicians.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(clinicians)
    }

    async fn create(&self, clinician: NewClinician) -> RepositoryResult<Clinician> {
        self.tables.write().await.insert_clinician(clinician)
    }

    async fn update_profile(&self, id: Id, update: &ProfileUpdate) -> RepositoryResult<Clinician> {
        let mut tables = self.tables.write().await;
        let clinician = tables
            .clinicians
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Clinician",
                id,
            })?;

        update.apply_to(clinician);
        clinician.updated_at = Utc::now();
        Ok(clinician.clone())
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.tables.read().await.clinicians.len() as i64)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn create(&self, token: Uuid) -> RepositoryResult<Invitation> {
        let mut tables = self.tables.write().await;
        if tables.invitations.values().any(|i| i.token == token) {
            return Err(RepositoryError::Conflict("Token already exists".to_string()));
        }

        let invitation = Invitation {
            id: tables.next_id(),
            token,
            is_used: false,
            created_at: Utc::now(),
            used_at: None,
            used_by_id: None,
        };
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_by_token(&self, token: Uuid) -> RepositoryResult<Option<Invitation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Invitation>> {
        let tables = self.tables.read().await;
        Ok(tables.invitations.values().rev().cloned().collect())
    }

    async fn redeem(
        &self,
        token: Uuid,
        clinician: NewClinician,
    ) -> RepositoryResult<Option<Clinician>> {
        let mut tables = self.tables.write().await;

        let Some(invitation_id) = tables
            .invitations
            .values()
            .find(|i| i.token == token && !i.is_used)
            .map(|i| i.id)
        else {
            return Ok(None);
        };

        let created = tables.insert_clinician(clinician)?;

        if let Some(invitation) = tables.invitations.get_mut(&invitation_id) {
            invitation.is_used = true;
            invitation.used_at = Some(Utc::now());
            invitation.used_by_id = Some(created.id);
        }

        Ok(Some(created))
    }
}

#[async_trait]
impl ImageSetStore for MemoryStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ImageSet>> {
        Ok(self.tables.read().await.image_sets.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ImageSet>> {
        let tables = self.tables.read().await;
        Ok(tables
            .image_sets
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list_summaries(&self) -> RepositoryResult<Vec<ImageSetSummary>> {
        let tables = self.tables.read().await;
        let summaries = tables
            .image_sets
            .values()
            .rev()
            .map(|set| {
                let (real, synthetic): (Vec<&ImageRecord>, Vec<&ImageRecord>) = tables
                    .images
                    .values()
                    .filter(|i| i.image_set_id == set.id)
                    .partition(|i| i.is_real);
                ImageSetSummary {
                    id: set.id,
                    name: set.name.clone(),
                    description: set.description.clone(),
                    is_active: set.is_active,
                    created_at: set.created_at,
                    real_count: real.len() as i64,
                    synthetic_count: synthetic.len() as i64,
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn create_with_images(
        &self,
        image_set: NewImageSet,
        images: Vec<NewImage>,
    ) -> RepositoryResult<ImageSet> {
        let mut tables = self.tables.write().await;

        if tables.image_sets.values().any(|s| s.name == image_set.name) {
            return Err(RepositoryError::Conflict(duplicate_name_message(
                &image_set.name,
            )));
        }

        let mut filenames = HashSet::new();
        for image in &images {
            if !filenames.insert(image.original_filename.as_str()) {
                return Err(RepositoryError::Conflict(format!(
                    "Duplicate image filename '{}'",
                    image.original_filename
                )));
            }
        }

        let now = Utc::now();
        let created = ImageSet {
            id: tables.next_id(),
            name: image_set.name,
            description: image_set.description,
            created_by_id: image_set.created_by_id,
            is_active: true,
            created_at: now,
        };
        tables.image_sets.insert(created.id, created.clone());

        for image in images {
            let record = ImageRecord {
                id: tables.next_id(),
                image_set_id: created.id,
                path: image.path,
                original_filename: image.original_filename,
                is_real: image.is_real,
                uploaded_at: now,
            };
            tables.images.insert(record.id, record);
        }

        Ok(created)
    }

    async fn images_for_set(&self, image_set_id: Id) -> RepositoryResult<Vec<ImageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .images
            .values()
            .filter(|i| i.image_set_id == image_set_id)
            .cloned()
            .collect())
    }

    async fn find_image(&self, id: Id) -> RepositoryResult<Option<ImageRecord>> {
        Ok(self.tables.read().await.images.get(&id).cloned())
    }

    async fn find_image_by_path(&self, path: &str) -> RepositoryResult<Option<ImageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.images.values().find(|i| i.path == path).cloned())
    }

    async fn count_images(&self) -> RepositoryResult<i64> {
        Ok(self.tables.read().await.images.len() as i64)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn create(&self, assignment: NewAssignment) -> RepositoryResult<Assignment> {
        let mut tables = self.tables.write().await;

        if tables.assignments.values().any(|a| {
            a.clinician_id == assignment.clinician_id && a.image_set_id == assignment.image_set_id
        }) {
            return Err(RepositoryError::Conflict(DUPLICATE_ASSIGNMENT.to_string()));
        }

        let created = Assignment {
            id: tables.next_id(),
            clinician_id: assignment.clinician_id,
            image_set_id: assignment.image_set_id,
            assigned_by_id: assignment.assigned_by_id,
            assigned_at: Utc::now(),
            is_completed: false,
            completed_at: None,
        };
        tables.assignments.insert(created.id, created.clone());

        let mut subset = assignment.image_ids;
        subset.sort_unstable();
        subset.dedup();
        if !subset.is_empty() {
            tables.assignment_images.insert(created.id, subset);
        }

        Ok(created)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Assignment>> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Assignment>> {
        Ok(self.tables.read().await.assignments.values().cloned().collect())
    }

    async fn for_clinician(&self, clinician_id: Id) -> RepositoryResult<Vec<Assignment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .rev()
            .filter(|a| a.clinician_id == clinician_id)
            .cloned()
            .collect())
    }

    async fn image_subset(&self, assignment_id: Id) -> RepositoryResult<Vec<Id>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignment_images
            .get(&assignment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_completed(&self, assignment_id: Id, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(assignment) = tables.assignments.get_mut(&assignment_id) {
            if !assignment.is_completed {
                assignment.is_completed = true;
                assignment.completed_at = Some(at);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn create(&self, evaluation: NewEvaluation) -> RepositoryResult<Evaluation> {
        let mut tables = self.tables.write().await;

        if tables.evaluations.values().any(|e| {
            e.clinician_id == evaluation.clinician_id && e.image_id == evaluation.image_id
        }) {
            return Err(RepositoryError::Conflict(ALREADY_EVALUATED.to_string()));
        }

        let created = Evaluation {
            id: tables.next_id(),
            clinician_id: evaluation.clinician_id,
            image_id: evaluation.image_id,
            is_real: evaluation.is_real,
            confidence: i32::from(evaluation.confidence.value()),
            created_at: Utc::now(),
        };
        tables.evaluations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn evaluated_image_ids(&self, clinician_id: Id) -> RepositoryResult<Vec<Id>> {
        let tables = self.tables.read().await;
        let mut ids: Vec<Id> = tables
            .evaluations
            .values()
            .filter(|e| e.clinician_id == clinician_id)
            .map(|e| e.image_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn details(&self, filter: &EvaluationFilter) -> RepositoryResult<Vec<EvaluationDetail>> {
        let tables = self.tables.read().await;
        let details = tables
            .evaluations
            .values()
            .filter_map(|e| {
                let image = tables.images.get(&e.image_id)?;
                Some(EvaluationDetail {
                    evaluation_id: e.id,
                    clinician_id: e.clinician_id,
                    image_id: e.image_id,
                    image_set_id: image.image_set_id,
                    image_path: image.path.clone(),
                    ground_truth_real: image.is_real,
                    judged_real: e.is_real,
                    confidence: e.confidence,
                    created_at: e.created_at,
                })
            })
            .filter(|d| filter.matches(d))
            .collect();
        Ok(details)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.tables.read().await.evaluations.len() as i64)
    }
}
