//! Repository for the `artifact_images` table.

use reliquary_core::types::DbId;
use sqlx::PgPool;

use crate::models::asset::{CreateImageAsset, ImageAsset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, artifact_id, file_path, file_name, file_size, mime_type, is_primary, \
     annotation, created_at";

/// Provides CRUD operations for image assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Insert a new image asset row, returning the created row.
    pub async fn create(
        pool: &PgPool,
        artifact_id: DbId,
        input: &CreateImageAsset,
    ) -> Result<ImageAsset, sqlx::Error> {
        let query = format!(
            "INSERT INTO artifact_images
                 (artifact_id, file_path, file_name, file_size, mime_type, is_primary, annotation)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(artifact_id)
            .bind(&input.file_path)
            .bind(&input.file_name)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(input.is_primary)
            .bind(&input.annotation)
            .fetch_one(pool)
            .await
    }

    /// Find an asset by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImageAsset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM artifact_images WHERE id = $1");
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an asset by its `(artifact_id, file_path)` key.
    pub async fn find_by_path(
        pool: &PgPool,
        artifact_id: DbId,
        file_path: &str,
    ) -> Result<Option<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM artifact_images
             WHERE artifact_id = $1 AND file_path = $2"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(artifact_id)
            .bind(file_path)
            .fetch_optional(pool)
            .await
    }

    /// List all assets for an artifact in insertion order.
    pub async fn list_by_artifact(
        pool: &PgPool,
        artifact_id: DbId,
    ) -> Result<Vec<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM artifact_images
             WHERE artifact_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(artifact_id)
            .fetch_all(pool)
            .await
    }

    /// List assets carrying a non-null annotation payload, in storage order.
    ///
    /// Storage order (ascending id) is the tie-breaker contract for
    /// timelapse frame listings.
    pub async fn list_annotated(
        pool: &PgPool,
        artifact_id: DbId,
    ) -> Result<Vec<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM artifact_images
             WHERE artifact_id = $1 AND annotation IS NOT NULL
             ORDER BY id"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(artifact_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the annotation payload on an existing asset row.
    ///
    /// Returns `None` if no row matches the `(artifact_id, file_path)` key.
    /// Concurrent writers are linearized by the store; last write wins.
    pub async fn set_annotation(
        pool: &PgPool,
        artifact_id: DbId,
        file_path: &str,
        annotation: &serde_json::Value,
    ) -> Result<Option<ImageAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE artifact_images SET annotation = $3
             WHERE artifact_id = $1 AND file_path = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(artifact_id)
            .bind(file_path)
            .bind(annotation)
            .fetch_optional(pool)
            .await
    }

    /// Delete an asset by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM artifact_images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
