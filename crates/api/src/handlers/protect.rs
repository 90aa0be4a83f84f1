//! Handlers for protected export/import.
//!
//! Role gating and rate limiting for these endpoints are deployment
//! concerns (reverse proxy / auth gate); the core enforces the password
//! policy and path confinement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use reliquary_core::types::DbId;
use reliquary_pipeline::protect::{protect_file, unprotect_file};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for both protect and unprotect requests.
#[derive(Debug, Deserialize)]
pub struct ProtectRequest {
    /// Path relative to the upload root.
    pub file_path: String,
    pub password: String,
}

/// POST /artifacts/{id}/protect
///
/// Wraps the named file in a password-encrypted envelope and records the
/// wrapper as a non-primary asset.
pub async fn protect(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Json(input): Json<ProtectRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = protect_file(
        &state.pool,
        state.store.upload_root(),
        artifact_id,
        &input.file_path,
        &input.password,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /artifacts/{id}/unprotect
///
/// Decrypts a protected wrapper back into a file carrying the original
/// extension. A wrong password is a decryption failure, never silent
/// corruption.
pub async fn unprotect(
    State(state): State<AppState>,
    Path(artifact_id): Path<DbId>,
    Json(input): Json<ProtectRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = unprotect_file(
        &state.pool,
        state.store.upload_root(),
        artifact_id,
        &input.file_path,
        &input.password,
    )
    .await?;

    Ok(Json(DataResponse { data: outcome }))
}
