//! Repository for the `artifacts` table.

use reliquary_core::types::DbId;
use sqlx::PgPool;

use crate::models::artifact::{Artifact, CreateArtifact, UpdateArtifact};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, catalog_number, name, site, era, category, project, status, \
                       images, created_at, updated_at";

/// Provides CRUD operations for artifacts.
pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Insert a new artifact, returning the created row.
    ///
    /// If `status` is `None`, defaults to `pending`.
    pub async fn create(pool: &PgPool, input: &CreateArtifact) -> Result<Artifact, sqlx::Error> {
        let query = format!(
            "INSERT INTO artifacts (catalog_number, name, site, era, category, project, status)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'pending'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(&input.catalog_number)
            .bind(&input.name)
            .bind(&input.site)
            .bind(&input.era)
            .bind(&input.category)
            .bind(&input.project)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Find an artifact by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Artifact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM artifacts WHERE id = $1");
        sqlx::query_as::<_, Artifact>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update an artifact. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateArtifact,
    ) -> Result<Option<Artifact>, sqlx::Error> {
        let query = format!(
            "UPDATE artifacts SET
                name = COALESCE($2, name),
                site = COALESCE($3, site),
                era = COALESCE($4, era),
                category = COALESCE($5, category),
                project = COALESCE($6, project),
                status = COALESCE($7, status),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.site)
            .bind(&input.era)
            .bind(&input.category)
            .bind(&input.project)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Append an asset path to the artifact's ordered image list.
    pub async fn append_image(
        pool: &PgPool,
        id: DbId,
        image_path: &str,
    ) -> Result<Option<Artifact>, sqlx::Error> {
        let query = format!(
            "UPDATE artifacts SET
                images = images || to_jsonb($2::text),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(id)
            .bind(image_path)
            .fetch_optional(pool)
            .await
    }

    /// Remove an asset path from the artifact's image list, preserving order
    /// of the remaining entries.
    pub async fn remove_image(
        pool: &PgPool,
        id: DbId,
        image_path: &str,
    ) -> Result<Option<Artifact>, sqlx::Error> {
        let query = format!(
            "UPDATE artifacts SET
                images = COALESCE(
                    (SELECT jsonb_agg(elem ORDER BY ord)
                     FROM jsonb_array_elements(images) WITH ORDINALITY AS t(elem, ord)
                     WHERE elem <> to_jsonb($2::text)),
                    '[]'::jsonb),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(id)
            .bind(image_path)
            .fetch_optional(pool)
            .await
    }

    /// Delete an artifact by ID (cascades to its asset rows). Returns `true`
    /// if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM artifacts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
