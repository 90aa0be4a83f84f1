//! Handlers for timelapse frame recording and listing.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use reliquary_core::types::DbId;
use reliquary_pipeline::timelapse::{self, RecordFrame};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /artifacts/{id}/timelapse
///
/// Decodes a data-URL frame capture (PNG or JPEG) and persists it with its
/// annotation sidecar.
pub async fn record_frame(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Json(input): Json<RecordFrame>,
) -> AppResult<impl IntoResponse> {
    let asset =
        timelapse::record_frame(&state.store, &state.pool, artifact_id, &input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /artifacts/{id}/timelapse/{timeline_id}
///
/// Lists the timeline's frames sorted ascending by step index.
pub async fn list_frames(
    State(state): State<AppState>,
    Path((artifact_id, timeline_id)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let frames =
        timelapse::list_frames(&state.store, &state.pool, artifact_id, &timeline_id).await?;

    Ok(Json(DataResponse { data: frames }))
}
