//! Admin panel payload

use chrono::{DateTime, Utc};
use mse_models::{AssignmentProgress, Clinician, EvaluationDetail, ImageSetSummary};
use serde::Serialize;

use crate::accuracy::{build_report, AccuracySummary, ClinicianStats};

/// Headline counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub clinicians: usize,
    pub image_sets: usize,
    pub images: i64,
    pub evaluations: usize,
    pub assignments: usize,
    pub completed_assignments: usize,
}

/// Everything the admin panel shows in one response
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub generated_at: DateTime<Utc>,
    pub totals: Totals,
    pub overall: AccuracySummary,
    pub ranking: Vec<ClinicianStats>,
    pub assignments: Vec<AssignmentProgress>,
    pub image_sets: Vec<ImageSetSummary>,
}

impl AdminDashboard {
    pub fn build(
        clinicians: &[Clinician],
        details: &[EvaluationDetail],
        assignments: Vec<AssignmentProgress>,
        image_sets: Vec<ImageSetSummary>,
    ) -> Self {
        let report = build_report(clinicians, details);

        let totals = Totals {
            clinicians: clinicians.len(),
            image_sets: image_sets.len(),
            images: image_sets.iter().map(ImageSetSummary::total_images).sum(),
            evaluations: details.len(),
            assignments: assignments.len(),
            completed_assignments: assignments
                .iter()
                .filter(|p| p.assignment.is_completed)
                .count(),
        };

        Self {
            generated_at: Utc::now(),
            totals,
            overall: report.overall,
            ranking: report.clinicians,
            assignments,
            image_sets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mse_models::Assignment;

    fn clinician(id: i64, username: &str) -> Clinician {
        let now = Utc::now();
        Clinician {
            id,
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            title: String::new(),
            workplace: String::new(),
            years_experience: 0,
            is_superuser: false,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn summary(id: i64, real: i64, synth: i64) -> ImageSetSummary {
        ImageSetSummary {
            id,
            name: format!("set{}", id),
            description: String::new(),
            is_active: true,
            created_at: Utc::now(),
            real_count: real,
            synthetic_count: synth,
        }
    }

    fn progress(id: i64, completed: bool) -> AssignmentProgress {
        let assignment = Assignment {
            id,
            clinician_id: 1,
            image_set_id: 1,
            assigned_by_id: None,
            assigned_at: Utc::now(),
            is_completed: completed,
            completed_at: completed.then(Utc::now),
        };
        AssignmentProgress::new(assignment, "set1", "doc", 0, 4)
    }

    #[test]
    fn test_totals() {
        let dashboard = AdminDashboard::build(
            &[clinician(1, "doc"), clinician(2, "nurse")],
            &[],
            vec![progress(1, true), progress(2, false)],
            vec![summary(1, 3, 2), summary(2, 1, 0)],
        );

        assert_eq!(
            dashboard.totals,
            Totals {
                clinicians: 2,
                image_sets: 2,
                images: 6,
                evaluations: 0,
                assignments: 2,
                completed_assignments: 1,
            }
        );
        assert_eq!(dashboard.ranking.len(), 2);
        assert_eq!(dashboard.overall.accuracy, None);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json["overall"]["accuracy"].is_null());
        assert_eq!(json["ranking"][0]["username"], "doc");
        assert_eq!(json["ranking"][0]["rank"], 1);
    }
}
