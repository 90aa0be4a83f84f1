//! Handlers for the annotation read/write boundary.
//!
//! Keyed by `(artifact_id, image_path)`. The write path is confined to the
//! artifact's asset directory by the store before any I/O.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use reliquary_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for reading annotations.
#[derive(Debug, Deserialize)]
pub struct AnnotationQuery {
    pub image_path: String,
}

/// Body for writing annotations.
#[derive(Debug, Deserialize)]
pub struct PutAnnotations {
    pub image_path: String,
    /// The annotation document in any of the supported shapes.
    pub document: Value,
}

/// GET /artifacts/{id}/annotations?image_path=…
///
/// Returns `{annotations, canvas}` normalized across the stored shapes;
/// an absent payload reads as empty.
pub async fn get_annotations(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Query(query): Query<AnnotationQuery>,
) -> AppResult<impl IntoResponse> {
    let read = state
        .store
        .get(&state.pool, artifact_id, &query.image_path)
        .await?;
    Ok(Json(DataResponse { data: read }))
}

/// PUT /artifacts/{id}/annotations
///
/// Upserts the annotation document for the asset key. The response is a
/// write-only acknowledgment carrying the canonical key, never the
/// document itself.
pub async fn put_annotations(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Json(input): Json<PutAnnotations>,
) -> AppResult<impl IntoResponse> {
    let image_path = state
        .store
        .put(&state.pool, artifact_id, &input.image_path, &input.document)
        .await?;

    tracing::info!(artifact_id, image_path = %image_path, "Annotations saved");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "image_path": image_path }),
    }))
}
