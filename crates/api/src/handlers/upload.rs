//! Handler for the image ingestion boundary.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use reliquary_core::types::DbId;
use reliquary_pipeline::ingest::{delete_image, ingest_image, UploadedFile};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /artifacts/{id}/images
///
/// Accepts a single multipart `file` field and runs the full ingestion
/// pipeline. Returns the canonical asset of the upload, which is the
/// synthesized preview when one was produced.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("multipart read failed: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("multipart read failed: {e}")))?
            .to_vec();

        upload = Some(UploadedFile {
            file_name,
            mime_type,
            bytes,
        });
    }

    let upload =
        upload.ok_or_else(|| AppError::BadRequest("missing multipart 'file' field".to_string()))?;

    let response = ingest_image(&state.store, &state.pool, artifact_id, upload).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// Query parameters for deleting an asset.
#[derive(Debug, Deserialize)]
pub struct DeleteImageQuery {
    pub image_path: String,
}

/// DELETE /artifacts/{id}/images?image_path=…
pub async fn remove_image(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Query(query): Query<DeleteImageQuery>,
) -> AppResult<impl IntoResponse> {
    delete_image(&state.store, &state.pool, artifact_id, &query.image_path).await?;
    Ok(StatusCode::NO_CONTENT)
}
