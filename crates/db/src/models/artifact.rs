//! Artifact entity model and DTOs.

use reliquary_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `artifacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Artifact {
    pub id: DbId,
    pub catalog_number: String,
    pub name: String,
    pub site: Option<String>,
    pub era: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
    pub status: String,
    /// Ordered JSON array of asset paths (insertion order = display order).
    pub images: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new artifact.
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct CreateArtifact {
    #[validate(length(min = 1, max = 64))]
    pub catalog_number: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub site: Option<String>,
    pub era: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
    /// Defaults to `pending` if omitted.
    pub status: Option<String>,
}

/// DTO for updating an existing artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateArtifact {
    pub name: Option<String>,
    pub site: Option<String>,
    pub era: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
}
