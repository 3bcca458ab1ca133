//! Image set repository
//!
//! Database operations for image sets and their image records.

use async_trait::async_trait;
use mse_core::traits::Id;
use mse_models::{ImageRecord, ImageSet, ImageSetSummary, NewImage, NewImageSet};
use sqlx::PgPool;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::ImageSetStore;

const IMAGE_SET_COLUMNS: &str = "id, name, description, created_by_id, is_active, created_at";
const IMAGE_COLUMNS: &str = "id, image_set_id, path, original_filename, is_real, uploaded_at";

pub(crate) fn duplicate_name_message(name: &str) -> String {
    format!("Image set '{}' already exists", name)
}

/// Image set repository implementation
pub struct ImageSetRepository {
    pool: PgPool,
}

impl ImageSetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageSetStore for ImageSetRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ImageSet>> {
        let sql = format!("SELECT {} FROM image_sets WHERE id = $1", IMAGE_SET_COLUMNS);
        let row = sqlx::query_as::<_, ImageSet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ImageSet>> {
        let sql = format!(
            "SELECT {} FROM image_sets WHERE name = $1",
            IMAGE_SET_COLUMNS
        );
        let row = sqlx::query_as::<_, ImageSet>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_summaries(&self) -> RepositoryResult<Vec<ImageSetSummary>> {
        let rows = sqlx::query_as::<_, ImageSetSummary>(
            r#"
            SELECT s.id, s.name, s.description, s.is_active, s.created_at,
                   COUNT(i.id) FILTER (WHERE i.is_real) AS real_count,
                   COUNT(i.id) FILTER (WHERE NOT i.is_real) AS synthetic_count
            FROM image_sets s
            LEFT JOIN images i ON i.image_set_id = s.id
            GROUP BY s.id
            ORDER BY s.created_at DESC, s.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_with_images(
        &self,
        image_set: NewImageSet,
        images: Vec<NewImage>,
    ) -> RepositoryResult<ImageSet> {
        if self.find_by_name(&image_set.name).await?.is_some() {
            return Err(RepositoryError::Conflict(duplicate_name_message(
                &image_set.name,
            )));
        }

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO image_sets (name, description, created_by_id, is_active, created_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            RETURNING {}
            "#,
            IMAGE_SET_COLUMNS
        );
        let created = sqlx::query_as::<_, ImageSet>(&sql)
            .bind(&image_set.name)
            .bind(&image_set.description)
            .bind(image_set.created_by_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, duplicate_name_message(&image_set.name)))?;

        for image in &images {
            sqlx::query(
                r#"
                INSERT INTO images (image_set_id, path, original_filename, is_real, uploaded_at)
                VALUES ($1, $2, $3, $4, NOW())
                "#,
            )
            .bind(created.id)
            .bind(&image.path)
            .bind(&image.original_filename)
            .bind(image.is_real)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                RepositoryError::from_unique(
                    e,
                    format!("Duplicate image filename '{}'", image.original_filename),
                )
            })?;
        }

        tx.commit().await?;

        tracing::info!(
            image_set_id = created.id,
            name = %created.name,
            images = images.len(),
            "image set created"
        );

        Ok(created)
    }

    async fn images_for_set(&self, image_set_id: Id) -> RepositoryResult<Vec<ImageRecord>> {
        let sql = format!(
            "SELECT {} FROM images WHERE image_set_id = $1 ORDER BY id ASC",
            IMAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ImageRecord>(&sql)
            .bind(image_set_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_image(&self, id: Id) -> RepositoryResult<Option<ImageRecord>> {
        let sql = format!("SELECT {} FROM images WHERE id = $1", IMAGE_COLUMNS);
        let row = sqlx::query_as::<_, ImageRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_image_by_path(&self, path: &str) -> RepositoryResult<Option<ImageRecord>> {
        let sql = format!(
            "SELECT {} FROM images WHERE path = $1 ORDER BY id ASC LIMIT 1",
            IMAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, ImageRecord>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn count_images(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
