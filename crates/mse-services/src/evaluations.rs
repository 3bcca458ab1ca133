//! Evaluation capture

use std::collections::HashSet;

use mse_auth::CurrentUser;
use mse_contracts::evaluations::EvaluationContract;
use mse_core::{Id, MseError, MseResult};
use mse_db::Stores;
use mse_models::{Evaluation, EvaluationSubmission};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::assignments::AssignmentService;

pub const NOT_ASSIGNED: &str = "This image is not assigned to you";

/// What the clinician should look at next
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextImage {
    pub completed: bool,
    pub image_id: Option<Id>,
    pub image_url: Option<String>,
    /// Unevaluated images left, including the one returned
    pub remaining: usize,
}

impl NextImage {
    fn completed() -> Self {
        Self {
            completed: true,
            image_id: None,
            image_url: None,
            remaining: 0,
        }
    }
}

pub struct EvaluationService {
    stores: Stores,
    assignments: AssignmentService,
    media_url: String,
}

impl EvaluationService {
    pub fn new(stores: Stores, media_url: impl Into<String>) -> Self {
        Self {
            assignments: AssignmentService::new(stores.clone()),
            stores,
            media_url: media_url.into(),
        }
    }

    /// Public URL of a stored image
    pub fn media_url_for(&self, path: &str) -> String {
        format!("{}/{}", self.media_url.trim_end_matches('/'), path)
    }

    /// Assigned images the clinician has not evaluated yet, by id
    pub async fn pending_image_ids(&self, clinician_id: Id) -> MseResult<Vec<Id>> {
        let assigned = self.assignments.assigned_images_for(clinician_id).await?;
        let evaluated: HashSet<Id> = self
            .stores
            .evaluations
            .evaluated_image_ids(clinician_id)
            .await?
            .into_iter()
            .collect();

        Ok(assigned
            .into_iter()
            .filter(|id| !evaluated.contains(id))
            .collect())
    }

    /// Pick a random pending image
    pub async fn next_image(&self, user: &CurrentUser) -> MseResult<NextImage> {
        let pending = self.pending_image_ids(user.id).await?;
        if pending.is_empty() {
            debug!(clinician_id = user.id, "No images left to evaluate");
            return Ok(NextImage::completed());
        }

        let image_id = pending[rand::rng().random_range(0..pending.len())];
        let image = self
            .stores
            .image_sets
            .find_image(image_id)
            .await?
            .ok_or_else(|| MseError::Internal(format!("assigned image {} is missing", image_id)))?;

        Ok(NextImage {
            completed: false,
            image_id: Some(image.id),
            image_url: Some(self.media_url_for(&image.path)),
            remaining: pending.len(),
        })
    }

    /// Record one judgment; an image can be evaluated once per clinician
    #[instrument(skip(self, user, submission), fields(clinician_id = user.id))]
    pub async fn submit(
        &self,
        user: &CurrentUser,
        submission: &EvaluationSubmission,
    ) -> MseResult<Evaluation> {
        let new = EvaluationContract.build(user.id, submission)?;

        let assigned = self.assignments.assigned_images_for(user.id).await?;
        if !assigned.contains(&new.image_id) {
            return Err(MseError::forbidden(NOT_ASSIGNED));
        }

        let evaluation = self.stores.evaluations.create(new).await?;
        info!(
            evaluation_id = evaluation.id,
            image_id = evaluation.image_id,
            "Evaluation recorded"
        );

        self.assignments
            .refresh_completion(user.id, evaluation.image_id)
            .await?;
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, clinician, image_set};
    use mse_models::{ImageRecord, NewAssignment};

    struct Fixture {
        stores: Stores,
        user: CurrentUser,
        images: Vec<ImageRecord>,
        service: EvaluationService,
    }

    async fn fixture(subset: bool) -> Fixture {
        let stores = Stores::in_memory();
        let admin = admin(&stores).await;
        let doc = clinician(&stores, "doctor1").await;
        let (set_id, images) = image_set(&stores, "study", 2, 1).await;

        let image_ids = if subset {
            vec![images[0].id, images[2].id]
        } else {
            Vec::new()
        };
        AssignmentService::new(stores.clone())
            .create(
                &admin,
                NewAssignment {
                    clinician_id: doc.id,
                    image_set_id: set_id,
                    image_ids,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Fixture {
            service: EvaluationService::new(stores.clone(), "/media/"),
            stores,
            user: CurrentUser::from(&doc),
            images,
        }
    }

    fn submission(image_id: Id, confidence: i64) -> EvaluationSubmission {
        EvaluationSubmission {
            image_id: Some(image_id),
            is_real: Some(true),
            confidence: Some(confidence),
        }
    }

    #[tokio::test]
    async fn test_next_image_until_completed() {
        let f = fixture(false).await;

        let mut seen = HashSet::new();
        for expected_remaining in (1..=3).rev() {
            let next = f.service.next_image(&f.user).await.unwrap();
            assert!(!next.completed);
            assert_eq!(next.remaining, expected_remaining);
            let image_id = next.image_id.unwrap();
            assert!(next.image_url.unwrap().starts_with("/media/image_sets/study/"));
            assert!(seen.insert(image_id));

            f.service
                .submit(&f.user, &submission(image_id, 4))
                .await
                .unwrap();
        }

        let next = f.service.next_image(&f.user).await.unwrap();
        assert_eq!(next, NextImage::completed());

        let assignment = &f.stores.assignments.for_clinician(f.user.id).await.unwrap()[0];
        assert!(assignment.is_completed);
    }

    #[tokio::test]
    async fn test_subset_limits_pending() {
        let f = fixture(true).await;
        let pending = f.service.pending_image_ids(f.user.id).await.unwrap();
        assert_eq!(pending, vec![f.images[0].id, f.images[2].id]);

        let err = f
            .service
            .submit(&f.user, &submission(f.images[1].id, 3))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_resubmit_is_conflict() {
        let f = fixture(false).await;
        let image_id = f.images[0].id;

        let first = f.service.submit(&f.user, &submission(image_id, 2)).await.unwrap();
        assert_eq!(first.confidence, 2);

        let err = f
            .service
            .submit(&f.user, &submission(image_id, 5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(f.stores.evaluations.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_submission() {
        let f = fixture(false).await;

        for bad in [
            submission(f.images[0].id, 0),
            submission(f.images[0].id, 6),
            EvaluationSubmission {
                image_id: Some(f.images[0].id),
                is_real: None,
                confidence: Some(3),
            },
        ] {
            let err = f.service.submit(&f.user, &bad).await.unwrap_err();
            assert_eq!(err.status_code(), 422);
        }
        assert_eq!(f.stores.evaluations.count().await.unwrap(), 0);
    }

    #[test]
    fn test_media_url() {
        let service = EvaluationService::new(Stores::in_memory(), "/media/");
        assert_eq!(
            service.media_url_for("image_sets/s/0a1b.png"),
            "/media/image_sets/s/0a1b.png"
        );
    }
}
