//! Assignment repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mse_core::traits::Id;
use mse_models::{Assignment, NewAssignment};
use sqlx::PgPool;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::AssignmentStore;

const ASSIGNMENT_COLUMNS: &str =
    "id, clinician_id, image_set_id, assigned_by_id, assigned_at, is_completed, completed_at";

pub(crate) const DUPLICATE_ASSIGNMENT: &str = "This image set is already assigned to the clinician";

/// Assignment repository implementation
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for AssignmentRepository {
    async fn create(&self, assignment: NewAssignment) -> RepositoryResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO assignments (clinician_id, image_set_id, assigned_by_id, assigned_at, is_completed)
            VALUES ($1, $2, $3, NOW(), FALSE)
            RETURNING {}
            "#,
            ASSIGNMENT_COLUMNS
        );
        let created = sqlx::query_as::<_, Assignment>(&sql)
            .bind(assignment.clinician_id)
            .bind(assignment.image_set_id)
            .bind(assignment.assigned_by_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_ASSIGNMENT))?;

        for image_id in &assignment.image_ids {
            sqlx::query(
                "INSERT INTO assignment_images (assignment_id, image_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(created.id)
            .bind(image_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Assignment>> {
        let sql = format!(
            "SELECT {} FROM assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list(&self) -> RepositoryResult<Vec<Assignment>> {
        let sql = format!("SELECT {} FROM assignments ORDER BY id ASC", ASSIGNMENT_COLUMNS);
        let rows = sqlx::query_as::<_, Assignment>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn for_clinician(&self, clinician_id: Id) -> RepositoryResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {} FROM assignments WHERE clinician_id = $1 ORDER BY assigned_at DESC, id DESC",
            ASSIGNMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Assignment>(&sql)
            .bind(clinician_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn image_subset(&self, assignment_id: Id) -> RepositoryResult<Vec<Id>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT image_id FROM assignment_images WHERE assignment_id = $1 ORDER BY image_id",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn mark_completed(&self, assignment_id: Id, at: DateTime<Utc>) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET is_completed = TRUE, completed_at = $2
            WHERE id = $1 AND is_completed = FALSE
            "#,
        )
        .bind(assignment_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
