//! Assignments and progress

use std::collections::{BTreeSet, HashMap, HashSet};

use mse_auth::CurrentUser;
use mse_contracts::assignments::CreateAssignmentContract;
use mse_contracts::Contract;
use mse_core::{Id, MseResult, OptionExt};
use mse_db::Stores;
use mse_models::{Assignment, AssignmentProgress, Clinician, ImageSet, NewAssignment};
use tracing::{info, instrument};

use crate::require_superuser;

#[derive(Clone)]
pub struct AssignmentService {
    stores: Stores,
}

impl AssignmentService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Assign an image set (or part of it) to a clinician
    #[instrument(skip(self, user, new), fields(
        clinician_id = new.clinician_id,
        image_set_id = new.image_set_id,
    ))]
    pub async fn create(&self, user: &CurrentUser, mut new: NewAssignment) -> MseResult<Assignment> {
        require_superuser(user)?;

        self.stores
            .clinicians
            .find_by_id(new.clinician_id)
            .await?
            .or_not_found::<Clinician>(new.clinician_id)?;
        self.stores
            .image_sets
            .find_by_id(new.image_set_id)
            .await?
            .or_not_found::<ImageSet>(new.image_set_id)?;

        let set_image_ids: HashSet<Id> = self
            .stores
            .image_sets
            .images_for_set(new.image_set_id)
            .await?
            .into_iter()
            .map(|image| image.id)
            .collect();

        CreateAssignmentContract::new(user, &set_image_ids).validate(&new)?;

        new.assigned_by_id = Some(user.id);
        let assignment = self.stores.assignments.create(new).await?;
        info!(assignment_id = assignment.id, "Assignment created");
        Ok(assignment)
    }

    /// Image ids covered by an assignment; an empty subset means the whole set
    pub async fn assigned_image_ids(&self, assignment: &Assignment) -> MseResult<Vec<Id>> {
        let subset = self.stores.assignments.image_subset(assignment.id).await?;
        if !subset.is_empty() {
            return Ok(subset);
        }

        Ok(self
            .stores
            .image_sets
            .images_for_set(assignment.image_set_id)
            .await?
            .into_iter()
            .map(|image| image.id)
            .collect())
    }

    /// Union of image ids over the clinician's assignments in active sets
    pub async fn assigned_images_for(&self, clinician_id: Id) -> MseResult<BTreeSet<Id>> {
        let mut ids = BTreeSet::new();
        for assignment in self.stores.assignments.for_clinician(clinician_id).await? {
            let active = self
                .stores
                .image_sets
                .find_by_id(assignment.image_set_id)
                .await?
                .is_some_and(|set| set.is_active);
            if active {
                ids.extend(self.assigned_image_ids(&assignment).await?);
            }
        }
        Ok(ids)
    }

    /// The clinician's own assignments with progress, newest first
    pub async fn for_clinician(&self, user: &CurrentUser) -> MseResult<Vec<AssignmentProgress>> {
        let assignments = self.stores.assignments.for_clinician(user.id).await?;
        self.with_progress(assignments).await
    }

    /// Every assignment with progress, for the admin panel
    pub async fn list_all(&self) -> MseResult<Vec<AssignmentProgress>> {
        let assignments = self.stores.assignments.list().await?;
        self.with_progress(assignments).await
    }

    /// Mark each of the clinician's assignments covering `image_id` as
    /// completed once all of its images are evaluated
    pub async fn refresh_completion(&self, clinician_id: Id, image_id: Id) -> MseResult<()> {
        let evaluated: HashSet<Id> = self
            .stores
            .evaluations
            .evaluated_image_ids(clinician_id)
            .await?
            .into_iter()
            .collect();

        for assignment in self.stores.assignments.for_clinician(clinician_id).await? {
            if assignment.is_completed {
                continue;
            }
            let assigned = self.assigned_image_ids(&assignment).await?;
            if !assigned.contains(&image_id) {
                continue;
            }
            if assigned.iter().all(|id| evaluated.contains(id)) {
                self.stores
                    .assignments
                    .mark_completed(assignment.id, chrono::Utc::now())
                    .await?;
                info!(assignment_id = assignment.id, "Assignment completed");
            }
        }
        Ok(())
    }

    async fn with_progress(
        &self,
        assignments: Vec<Assignment>,
    ) -> MseResult<Vec<AssignmentProgress>> {
        let mut set_names: HashMap<Id, String> = HashMap::new();
        let mut usernames: HashMap<Id, String> = HashMap::new();
        let mut evaluated_by: HashMap<Id, HashSet<Id>> = HashMap::new();
        let mut rows = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            if !set_names.contains_key(&assignment.image_set_id) {
                let name = self
                    .stores
                    .image_sets
                    .find_by_id(assignment.image_set_id)
                    .await?
                    .map(|set| set.name)
                    .unwrap_or_default();
                set_names.insert(assignment.image_set_id, name);
            }
            if !usernames.contains_key(&assignment.clinician_id) {
                let username = self
                    .stores
                    .clinicians
                    .find_by_id(assignment.clinician_id)
                    .await?
                    .map(|c| c.username)
                    .unwrap_or_default();
                usernames.insert(assignment.clinician_id, username);
            }
            if !evaluated_by.contains_key(&assignment.clinician_id) {
                let ids = self
                    .stores
                    .evaluations
                    .evaluated_image_ids(assignment.clinician_id)
                    .await?;
                evaluated_by.insert(assignment.clinician_id, ids.into_iter().collect());
            }

            let assigned = self.assigned_image_ids(&assignment).await?;
            let done = evaluated_by
                .get(&assignment.clinician_id)
                .map(|evaluated| assigned.iter().filter(|id| evaluated.contains(id)).count())
                .unwrap_or(0);

            let set_name = set_names
                .get(&assignment.image_set_id)
                .cloned()
                .unwrap_or_default();
            let username = usernames
                .get(&assignment.clinician_id)
                .cloned()
                .unwrap_or_default();
            rows.push(AssignmentProgress::new(
                assignment,
                set_name,
                username,
                done,
                assigned.len(),
            ));
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, clinician, image_set};
    use mse_core::{Confidence, MseError};
    use mse_models::NewEvaluation;

    #[tokio::test]
    async fn test_create_requires_superuser() {
        let stores = Stores::in_memory();
        let doc = clinician(&stores, "doctor1").await;
        let (set_id, _) = image_set(&stores, "study", 2, 2).await;
        let service = AssignmentService::new(stores);

        let err = service
            .create(
                &CurrentUser::from(&doc),
                NewAssignment {
                    clinician_id: doc.id,
                    image_set_id: set_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_create_whole_set_and_duplicate() {
        let stores = Stores::in_memory();
        let admin = admin(&stores).await;
        let doc = clinician(&stores, "doctor1").await;
        let (set_id, images) = image_set(&stores, "study", 2, 2).await;
        let service = AssignmentService::new(stores);

        let new = NewAssignment {
            clinician_id: doc.id,
            image_set_id: set_id,
            ..Default::default()
        };
        let assignment = service.create(&admin, new.clone()).await.unwrap();
        assert_eq!(assignment.assigned_by_id, Some(admin.id));
        assert_eq!(
            service.assigned_image_ids(&assignment).await.unwrap(),
            images.iter().map(|i| i.id).collect::<Vec<_>>()
        );

        let err = service.create(&admin, new).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_subset_must_belong_to_set() {
        let stores = Stores::in_memory();
        let admin = admin(&stores).await;
        let doc = clinician(&stores, "doctor1").await;
        let (set_id, _) = image_set(&stores, "study", 1, 1).await;
        let (_, other_images) = image_set(&stores, "other", 1, 0).await;
        let service = AssignmentService::new(stores);

        let err = service
            .create(
                &admin,
                NewAssignment {
                    clinician_id: doc.id,
                    image_set_id: set_id,
                    image_ids: vec![other_images[0].id],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MseError::Validation(ref e) if e.has_error("image_ids")));

        let err = service
            .create(
                &admin,
                NewAssignment {
                    clinician_id: 999,
                    image_set_id: set_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_progress_and_completion() {
        let stores = Stores::in_memory();
        let admin = admin(&stores).await;
        let doc = clinician(&stores, "doctor1").await;
        let (set_id, images) = image_set(&stores, "study", 2, 2).await;
        let service = AssignmentService::new(stores.clone());

        service
            .create(
                &admin,
                NewAssignment {
                    clinician_id: doc.id,
                    image_set_id: set_id,
                    image_ids: vec![images[0].id, images[3].id],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let user = CurrentUser::from(&doc);
        let rows = service.for_clinician(&user).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].evaluated, rows[0].assigned), (0, 2));
        assert_eq!(rows[0].image_set_name, "study");

        for image in [&images[0], &images[3]] {
            stores
                .evaluations
                .create(NewEvaluation {
                    clinician_id: doc.id,
                    image_id: image.id,
                    is_real: true,
                    confidence: Confidence::new(3).unwrap(),
                })
                .await
                .unwrap();
            service.refresh_completion(doc.id, image.id).await.unwrap();
        }

        let rows = service.list_all().await.unwrap();
        assert_eq!(rows[0].percent, 100.0);
        assert_eq!(rows[0].clinician_username, "doctor1");
        assert!(rows[0].assignment.is_completed);
        assert!(rows[0].assignment.completed_at.is_some());
    }
}
