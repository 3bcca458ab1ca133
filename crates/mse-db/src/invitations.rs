//! Invitation repository
//!
//! Token consumption and account creation share one transaction.

use async_trait::async_trait;
use mse_models::{Clinician, Invitation, NewClinician};
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinicians::insert_clinician;
use crate::repository::RepositoryResult;
use crate::store::InvitationStore;

const INVITATION_COLUMNS: &str = "id, token, is_used, created_at, used_at, used_by_id";

/// Invitation repository implementation
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationStore for InvitationRepository {
    async fn create(&self, token: Uuid) -> RepositoryResult<Invitation> {
        let sql = format!(
            "INSERT INTO invitations (token, is_used, created_at) VALUES ($1, FALSE, NOW()) RETURNING {}",
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Invitation>(&sql)
            .bind(token)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_token(&self, token: Uuid) -> RepositoryResult<Option<Invitation>> {
        let sql = format!(
            "SELECT {} FROM invitations WHERE token = $1",
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Invitation>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list(&self) -> RepositoryResult<Vec<Invitation>> {
        let sql = format!(
            "SELECT {} FROM invitations ORDER BY created_at DESC, id DESC",
            INVITATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Invitation>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn redeem(
        &self,
        token: Uuid,
        clinician: NewClinician,
    ) -> RepositoryResult<Option<Clinician>> {
        let mut tx = self.pool.begin().await?;

        // Conditional update: only one concurrent caller can flip is_used
        let invitation_id = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE invitations
            SET is_used = TRUE, used_at = NOW()
            WHERE token = $1 AND is_used = FALSE
            RETURNING id
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invitation_id) = invitation_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        // On error the transaction is dropped and the token stays unused
        let created = insert_clinician(&mut *tx, &clinician).await?;

        sqlx::query("UPDATE invitations SET used_by_id = $1 WHERE id = $2")
            .bind(created.id)
            .bind(invitation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            clinician_id = created.id,
            invitation_id,
            "invitation redeemed"
        );

        Ok(Some(created))
    }
}
