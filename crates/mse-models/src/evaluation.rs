//! Evaluation model
//!
//! Table: evaluations

use chrono::{DateTime, Utc};
use mse_core::traits::{Entity, Id, Identifiable, Timestamped};
use mse_core::types::{Confidence, ImageKind};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One clinician's judgment of one image
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: Id,
    pub clinician_id: Id,
    pub image_id: Id,
    /// Judged classification
    pub is_real: bool,
    pub confidence: i32,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for Evaluation {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Evaluation {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Entity for Evaluation {
    const TABLE_NAME: &'static str = "evaluations";
    const TYPE_NAME: &'static str = "Evaluation";
}

/// Validated data for inserting an evaluation
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub clinician_id: Id,
    pub image_id: Id,
    pub is_real: bool,
    pub confidence: Confidence,
}

/// Raw submission body; every field is checked by the evaluation contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub image_id: Option<Id>,
    pub is_real: Option<bool>,
    pub confidence: Option<i64>,
}

/// Evaluation joined with its image's ground truth
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationDetail {
    pub evaluation_id: Id,
    pub clinician_id: Id,
    pub image_id: Id,
    pub image_set_id: Id,
    pub image_path: String,
    pub ground_truth_real: bool,
    pub judged_real: bool,
    pub confidence: i32,
    pub created_at: DateTime<Utc>,
}

impl EvaluationDetail {
    pub fn is_correct(&self) -> bool {
        self.judged_real == self.ground_truth_real
    }

    /// Ground-truth kind of the evaluated image
    pub fn kind(&self) -> ImageKind {
        ImageKind::from_is_real(self.ground_truth_real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correctness_uses_ground_truth() {
        let mut detail = EvaluationDetail {
            evaluation_id: 1,
            clinician_id: 1,
            image_id: 1,
            image_set_id: 1,
            image_path: "image_sets/s/synth/a.png".into(),
            ground_truth_real: false,
            judged_real: false,
            confidence: 4,
            created_at: Utc::now(),
        };
        assert!(detail.is_correct());
        assert_eq!(detail.kind(), ImageKind::Synthetic);

        detail.judged_real = true;
        assert!(!detail.is_correct());
    }
}
