//! Handlers for artifact catalog registration.
//!
//! Minimal CRUD over the catalog record; the list/report surfaces live in
//! the admin UI and are not part of this service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use reliquary_core::catalog::ArtifactStatus;
use reliquary_core::error::CoreError;
use reliquary_core::types::DbId;
use reliquary_db::models::artifact::{CreateArtifact, UpdateArtifact};
use reliquary_db::repositories::ArtifactRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /artifacts
///
/// Register a new artifact in the catalog.
pub async fn create_artifact(
    State(state): State<AppState>,
    Json(input): Json<CreateArtifact>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    if let Some(ref status) = input.status {
        ArtifactStatus::from_name(status).map_err(AppError::Core)?;
    }

    let artifact = ArtifactRepo::create(&state.pool, &input).await?;

    tracing::info!(
        artifact_id = artifact.id,
        catalog_number = %artifact.catalog_number,
        "Artifact registered"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: artifact })))
}

/// GET /artifacts/{id}
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let artifact = ArtifactRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Artifact",
            id,
        }))?;
    Ok(Json(DataResponse { data: artifact }))
}

/// PUT /artifacts/{id}
///
/// Update descriptive fields; only provided fields are applied.
pub async fn update_artifact(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateArtifact>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref status) = input.status {
        ArtifactStatus::from_name(status).map_err(AppError::Core)?;
    }

    let artifact = ArtifactRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Artifact",
            id,
        }))?;

    tracing::info!(artifact_id = id, "Artifact updated");

    Ok(Json(DataResponse { data: artifact }))
}

/// DELETE /artifacts/{id}
///
/// Delete an artifact; asset rows cascade with it.
pub async fn delete_artifact(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = ArtifactRepo::delete(&state.pool, id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Artifact",
            id,
        }));
    }

    tracing::info!(artifact_id = id, "Artifact deleted");

    Ok(StatusCode::NO_CONTENT)
}
