//! Admin reporting: dashboard, per-clinician stats and export

use std::collections::HashMap;

use mse_auth::CurrentUser;
use mse_core::{Id, MseResult, OptionExt};
use mse_db::{EvaluationFilter, Stores};
use mse_models::Clinician;
use mse_reports::{build_export, build_report, AdminDashboard, ClinicianStats, ExportRecord};
use tracing::{debug, info};

use crate::assignments::AssignmentService;
use crate::require_superuser;

pub struct ReportingService {
    stores: Stores,
    assignments: AssignmentService,
}

impl ReportingService {
    pub fn new(stores: Stores) -> Self {
        Self {
            assignments: AssignmentService::new(stores.clone()),
            stores,
        }
    }

    /// Statistics payload for the admin panel
    pub async fn dashboard(&self, user: &CurrentUser) -> MseResult<AdminDashboard> {
        require_superuser(user)?;

        let clinicians = self.stores.clinicians.list().await?;
        let details = self.stores.evaluations.details(&EvaluationFilter::all()).await?;
        let assignments = self.assignments.list_all().await?;
        let image_sets = self.stores.image_sets.list_summaries().await?;

        debug!(
            clinicians = clinicians.len(),
            evaluations = details.len(),
            "Building admin dashboard"
        );
        Ok(AdminDashboard::build(
            &clinicians,
            &details,
            assignments,
            image_sets,
        ))
    }

    /// One clinician's row, ranked against everyone else
    pub async fn clinician_stats(
        &self,
        user: &CurrentUser,
        clinician_id: Id,
    ) -> MseResult<ClinicianStats> {
        require_superuser(user)?;

        let clinicians = self.stores.clinicians.list().await?;
        let details = self.stores.evaluations.details(&EvaluationFilter::all()).await?;
        build_report(&clinicians, &details)
            .for_clinician(clinician_id)
            .cloned()
            .or_not_found::<Clinician>(clinician_id)
    }

    /// Export the selected evaluations; unknown ids are ignored
    pub async fn export(&self, user: &CurrentUser, ids: Vec<Id>) -> MseResult<Vec<ExportRecord>> {
        require_superuser(user)?;

        let details = self
            .stores
            .evaluations
            .details(&EvaluationFilter::with_ids(ids))
            .await?;
        let clinicians: HashMap<Id, Clinician> = self
            .stores
            .clinicians
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let records = build_export(&details, &clinicians);
        info!(count = records.len(), exported_by = user.id, "Evaluations exported");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluations::EvaluationService;
    use crate::test_support::{admin, clinician, image_set};
    use mse_models::{EvaluationSubmission, NewAssignment, ProfileUpdate};

    struct Fixture {
        stores: Stores,
        admin: CurrentUser,
        doctor: CurrentUser,
        evaluation_ids: Vec<Id>,
    }

    /// doctor1 judges every image of a 2 real + 2 synthetic set as real
    async fn fixture() -> Fixture {
        let stores = Stores::in_memory();
        let admin = admin(&stores).await;
        let doc = clinician(&stores, "doctor1").await;
        clinician(&stores, "doctor2").await;
        let (set_id, images) = image_set(&stores, "study", 2, 2).await;

        AssignmentService::new(stores.clone())
            .create(
                &admin,
                NewAssignment {
                    clinician_id: doc.id,
                    image_set_id: set_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let doctor = CurrentUser::from(&doc);
        let evaluations = EvaluationService::new(stores.clone(), "/media/");
        let mut evaluation_ids = Vec::new();
        for image in &images {
            let evaluation = evaluations
                .submit(
                    &doctor,
                    &EvaluationSubmission {
                        image_id: Some(image.id),
                        is_real: Some(true),
                        confidence: Some(4),
                    },
                )
                .await
                .unwrap();
            evaluation_ids.push(evaluation.id);
        }

        Fixture {
            stores,
            admin,
            doctor,
            evaluation_ids,
        }
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let f = fixture().await;
        let service = ReportingService::new(f.stores.clone());

        assert_eq!(service.dashboard(&f.doctor).await.unwrap_err().status_code(), 403);
        assert_eq!(
            service
                .export(&f.doctor, f.evaluation_ids.clone())
                .await
                .unwrap_err()
                .status_code(),
            403
        );
    }

    #[tokio::test]
    async fn test_dashboard() {
        let f = fixture().await;
        let dashboard = ReportingService::new(f.stores.clone())
            .dashboard(&f.admin)
            .await
            .unwrap();

        assert_eq!(dashboard.totals.evaluations, 4);
        assert_eq!(dashboard.totals.images, 4);
        assert_eq!(dashboard.totals.completed_assignments, 1);
        assert_eq!(dashboard.overall.accuracy, Some(50.0));
        assert_eq!(dashboard.overall.real.accuracy, Some(100.0));
        assert_eq!(dashboard.overall.synthetic.accuracy, Some(0.0));

        let first = &dashboard.ranking[0];
        assert_eq!(first.username, "doctor1");
        assert_eq!(first.rank, 1);
        assert!(dashboard
            .ranking
            .iter()
            .skip(1)
            .all(|row| row.summary.accuracy.is_none()));
    }

    #[tokio::test]
    async fn test_clinician_stats() {
        let f = fixture().await;
        let service = ReportingService::new(f.stores.clone());

        let stats = service.clinician_stats(&f.admin, f.doctor.id).await.unwrap();
        assert_eq!(stats.summary.total, 4);
        assert_eq!(stats.summary.average_confidence, Some(4.0));

        let err = service.clinician_stats(&f.admin, 999).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_export_uses_current_profile() {
        let f = fixture().await;
        f.stores
            .clinicians
            .update_profile(
                f.doctor.id,
                &ProfileUpdate {
                    title: Some("Prof.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut ids = vec![f.evaluation_ids[2], f.evaluation_ids[0], 12345];
        ids.sort_unstable_by(|a, b| b.cmp(a));
        let records = ReportingService::new(f.stores.clone())
            .export(&f.admin, ids)
            .await
            .unwrap();

        let exported: Vec<Id> = records.iter().map(|r| r.id).collect();
        assert_eq!(exported, vec![f.evaluation_ids[0], f.evaluation_ids[2]]);
        assert!(records.iter().all(|r| r.clinician.title == "Prof."));
        assert!(records.iter().all(|r| r.is_real));
    }
}
