//! Evaluation repository

use async_trait::async_trait;
use mse_core::traits::Id;
use mse_models::{Evaluation, EvaluationDetail, NewEvaluation};
use sqlx::PgPool;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{EvaluationFilter, EvaluationStore};

pub(crate) const ALREADY_EVALUATED: &str = "This image has already been evaluated";

/// Evaluation repository implementation
pub struct EvaluationRepository {
    pool: PgPool,
}

impl EvaluationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationStore for EvaluationRepository {
    async fn create(&self, evaluation: NewEvaluation) -> RepositoryResult<Evaluation> {
        let row = sqlx::query_as::<_, Evaluation>(
            r#"
            INSERT INTO evaluations (clinician_id, image_id, is_real, confidence, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, clinician_id, image_id, is_real, confidence, created_at
            "#,
        )
        .bind(evaluation.clinician_id)
        .bind(evaluation.image_id)
        .bind(evaluation.is_real)
        .bind(i32::from(evaluation.confidence.value()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, ALREADY_EVALUATED))?;

        Ok(row)
    }

    async fn evaluated_image_ids(&self, clinician_id: Id) -> RepositoryResult<Vec<Id>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT image_id FROM evaluations WHERE clinician_id = $1 ORDER BY image_id",
        )
        .bind(clinician_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn details(&self, filter: &EvaluationFilter) -> RepositoryResult<Vec<EvaluationDetail>> {
        let rows = sqlx::query_as::<_, EvaluationDetail>(
            r#"
            SELECT e.id AS evaluation_id, e.clinician_id, e.image_id, i.image_set_id,
                   i.path AS image_path, i.is_real AS ground_truth_real,
                   e.is_real AS judged_real, e.confidence, e.created_at
            FROM evaluations e
            JOIN images i ON i.id = e.image_id
            WHERE ($1::BIGINT IS NULL OR e.clinician_id = $1)
              AND ($2::BIGINT[] IS NULL OR e.id = ANY($2))
            ORDER BY e.id ASC
            "#,
        )
        .bind(filter.clinician_id)
        .bind(filter.ids.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM evaluations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
