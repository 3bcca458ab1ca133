//! Clinician repository
//!
//! Database operations for clinician accounts.

use async_trait::async_trait;
use mse_core::traits::Id;
use mse_models::{Clinician, NewClinician, ProfileUpdate};
use sqlx::PgPool;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::ClinicianStore;

pub(crate) const CLINICIAN_COLUMNS: &str = "id, username, email, first_name, last_name, title, \
     workplace, years_experience, is_superuser, password_hash, created_at, updated_at";

pub(crate) const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Insert a clinician on any executor (pool or open transaction)
pub(crate) async fn insert_clinician<'e, E>(
    executor: E,
    clinician: &NewClinician,
) -> RepositoryResult<Clinician>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO clinicians (username, email, first_name, last_name, title, workplace,
                                years_experience, is_superuser, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
        RETURNING {}
        "#,
        CLINICIAN_COLUMNS
    );

    sqlx::query_as::<_, Clinician>(&sql)
        .bind(&clinician.username)
        .bind(&clinician.email)
        .bind(&clinician.first_name)
        .bind(&clinician.last_name)
        .bind(&clinician.title)
        .bind(&clinician.workplace)
        .bind(clinician.years_experience)
        .bind(clinician.is_superuser)
        .bind(&clinician.password_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| RepositoryError::from_unique(e, USERNAME_TAKEN))
}

/// Clinician repository implementation
pub struct ClinicianRepository {
    pool: PgPool,
}

impl ClinicianRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if a username is available
    pub async fn is_username_available(&self, username: &str) -> RepositoryResult<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clinicians WHERE username = $1")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(count == 0)
    }
}

#[async_trait]
impl ClinicianStore for ClinicianRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Clinician>> {
        let sql = format!("SELECT {} FROM clinicians WHERE id = $1", CLINICIAN_COLUMNS);
        let row = sqlx::query_as::<_, Clinician>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Clinician>> {
        let sql = format!(
            "SELECT {} FROM clinicians WHERE username = $1",
            CLINICIAN_COLUMNS
        );
        let row = sqlx::query_as::<_, Clinician>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list(&self) -> RepositoryResult<Vec<Clinician>> {
        let sql = format!(
            "SELECT {} FROM clinicians ORDER BY username ASC",
            CLINICIAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, Clinician>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn create(&self, clinician: NewClinician) -> RepositoryResult<Clinician> {
        if !self.is_username_available(&clinician.username).await? {
            return Err(RepositoryError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let row = insert_clinician(&self.pool, &clinician).await?;
        tracing::debug!(clinician_id = row.id, username = %row.username, "clinician created");

        Ok(row)
    }

    async fn update_profile(&self, id: Id, update: &ProfileUpdate) -> RepositoryResult<Clinician> {
        let mut existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Clinician",
                id,
            })?;

        update.apply_to(&mut existing);

        let sql = format!(
            r#"
            UPDATE clinicians
            SET email = $2, first_name = $3, last_name = $4, title = $5,
                workplace = $6, years_experience = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CLINICIAN_COLUMNS
        );
        let row = sqlx::query_as::<_, Clinician>(&sql)
            .bind(id)
            .bind(&existing.email)
            .bind(&existing.first_name)
            .bind(&existing.last_name)
            .bind(&existing.title)
            .bind(&existing.workplace)
            .bind(existing.years_experience)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clinicians")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
