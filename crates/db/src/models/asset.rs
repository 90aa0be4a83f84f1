//! Image asset entity model and DTOs.
//!
//! One row per stored file. A single logical upload can produce several
//! rows sharing the same artifact: the primary original plus non-primary
//! derivatives (preview, thumbnail) and exported byproducts.

use reliquary_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `artifact_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageAsset {
    pub id: DbId,
    pub artifact_id: DbId,
    /// Path relative to the upload root.
    pub file_path: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub is_primary: bool,
    /// Opaque annotation payload; `None` when nothing is stored.
    pub annotation: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new image asset row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImageAsset {
    pub file_path: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub is_primary: bool,
    pub annotation: Option<serde_json::Value>,
}
