//! Contract for evaluation submissions

use mse_core::error::ValidationErrors;
use mse_core::traits::Id;
use mse_core::types::Confidence;
use mse_models::{EvaluationSubmission, NewEvaluation};

use crate::base::{Contract, ValidationResult};

/// Checks a raw submission; assignment and duplicate checks happen in the service
pub struct EvaluationContract;

impl EvaluationContract {
    /// Validate and convert into insertable data for `clinician_id`
    pub fn build(
        &self,
        clinician_id: Id,
        submission: &EvaluationSubmission,
    ) -> Result<NewEvaluation, ValidationErrors> {
        self.validate(submission)?;

        match (
            submission.image_id,
            submission.is_real,
            submission.confidence.and_then(Confidence::new),
        ) {
            (Some(image_id), Some(is_real), Some(confidence)) => Ok(NewEvaluation {
                clinician_id,
                image_id,
                is_real,
                confidence,
            }),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add_base("Incomplete evaluation");
                Err(errors)
            }
        }
    }
}

impl Contract<EvaluationSubmission> for EvaluationContract {
    fn validate(&self, entity: &EvaluationSubmission) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if entity.image_id.is_none() {
            errors.add("image_id", "can't be blank");
        }

        if entity.is_real.is_none() {
            errors.add("is_real", "must be selected as real or synthetic");
        }

        match entity.confidence {
            None => errors.add("confidence", "can't be blank"),
            Some(value) if Confidence::new(value).is_none() => errors.add(
                "confidence",
                format!(
                    "must be between {} and {}",
                    Confidence::MIN,
                    Confidence::MAX
                ),
            ),
            Some(_) => {}
        }

        errors.into_result()
    }
}
