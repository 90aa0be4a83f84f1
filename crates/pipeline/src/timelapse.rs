//! Timelapse frame recording and listing.
//!
//! Frames are ordinary non-primary assets whose annotation payload is a
//! sidecar `{timeline_id, step_index, annotations}`. Sidecars share the
//! annotation store's at-rest policy: with encryption on they are sealed
//! like any other payload, and listing unseals before filtering.

use std::path::Path;

use reliquary_core::error::CoreError;
use reliquary_core::timelapse::{decode_frame_data_url, parse_sidecar, FrameSidecar};
use reliquary_core::types::{DbId, Timestamp};
use reliquary_db::models::asset::{CreateImageAsset, ImageAsset};
use reliquary_db::repositories::{ArtifactRepo, AssetRepo};
use reliquary_db::DbPool;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations::AnnotationStore;
use crate::error::PipelineResult;
use crate::fsio;

/// Request payload for recording a frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordFrame {
    pub timeline_id: String,
    /// Explicit ordering index. When absent a time-based fallback is used,
    /// which can collide or misorder under concurrency; callers needing
    /// reliable ordering must supply explicit indices.
    pub step_index: Option<i64>,
    /// `data:image/png;base64,…` or `data:image/jpeg;base64,…` capture.
    pub frame: String,
    pub annotations: Option<Value>,
}

/// One frame of a timeline, in listing order.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineFrame {
    pub file_path: String,
    pub step_index: i64,
    pub annotations: Value,
    pub created_at: Timestamp,
}

/// Decode and persist a frame capture as a non-primary asset.
pub async fn record_frame(
    store: &AnnotationStore,
    pool: &DbPool,
    artifact_id: DbId,
    input: &RecordFrame,
) -> PipelineResult<ImageAsset> {
    if input.timeline_id.trim().is_empty() {
        return Err(CoreError::Validation("timeline_id must not be empty".to_string()).into());
    }

    let (bytes, ext) = decode_frame_data_url(&input.frame)?;
    ensure_artifact_exists(pool, artifact_id).await?;

    let step_index = input.step_index.unwrap_or_else(fallback_step_index);

    let file_name = format!(
        "frame_{}_{}.{ext}",
        sanitize_timeline_id(&input.timeline_id),
        uuid::Uuid::new_v4().simple()
    );
    let rel_path = format!("artifacts/{artifact_id}/{file_name}");
    let abs_path = frame_abs_path(store.upload_root(), &rel_path)?;
    fsio::write_durable(&abs_path, &bytes).await?;

    let sidecar = FrameSidecar {
        timeline_id: input.timeline_id.clone(),
        step_index,
        annotations: input.annotations.clone().unwrap_or(Value::Null),
    };
    let payload = serde_json::to_value(&sidecar)
        .map_err(|e| CoreError::Internal(format!("sidecar serialization: {e}")))?;
    let stored = store.seal(&payload)?;

    let mime_type = if ext == "png" { "image/png" } else { "image/jpeg" };
    let asset = AssetRepo::create(
        pool,
        artifact_id,
        &CreateImageAsset {
            file_path: rel_path,
            file_name,
            file_size: Some(bytes.len() as i64),
            mime_type: Some(mime_type.to_string()),
            is_primary: false,
            annotation: Some(stored),
        },
    )
    .await?;

    tracing::info!(
        artifact_id,
        timeline_id = %input.timeline_id,
        step_index,
        asset_id = asset.id,
        "Timelapse frame recorded"
    );

    Ok(asset)
}

/// List a timeline's frames sorted ascending by step index, stable on
/// storage-order ties.
pub async fn list_frames(
    store: &AnnotationStore,
    pool: &DbPool,
    artifact_id: DbId,
    timeline_id: &str,
) -> PipelineResult<Vec<TimelineFrame>> {
    ensure_artifact_exists(pool, artifact_id).await?;

    let assets = AssetRepo::list_annotated(pool, artifact_id).await?;

    let mut frames = Vec::new();
    for asset in assets {
        let Some(stored) = asset.annotation else {
            continue;
        };
        let payload = store.unseal(&stored)?;
        let Some(sidecar) = parse_sidecar(&payload) else {
            continue;
        };
        if sidecar.timeline_id != timeline_id {
            continue;
        }
        frames.push(TimelineFrame {
            file_path: asset.file_path,
            step_index: sidecar.step_index,
            annotations: sidecar.annotations,
            created_at: asset.created_at,
        });
    }

    // `list_annotated` returns storage order, and a stable sort keeps it
    // as the tie-breaker.
    frames.sort_by_key(|f| f.step_index);
    Ok(frames)
}

async fn ensure_artifact_exists(pool: &DbPool, artifact_id: DbId) -> PipelineResult<()> {
    if ArtifactRepo::find_by_id(pool, artifact_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "Artifact",
            id: artifact_id,
        }
        .into());
    }
    Ok(())
}

fn frame_abs_path(upload_root: &Path, rel_path: &str) -> Result<std::path::PathBuf, CoreError> {
    reliquary_core::pathguard::confine(upload_root, rel_path)
}

/// Unix-time seconds, the known-weak fallback for a missing step index.
fn fallback_step_index() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sanitize_timeline_id(timeline_id: &str) -> String {
    timeline_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_index_is_time_based() {
        let before = chrono::Utc::now().timestamp();
        let index = fallback_step_index();
        let after = chrono::Utc::now().timestamp();
        assert!(index >= before && index <= after);
    }

    #[test]
    fn timeline_id_is_sanitized_for_file_names() {
        assert_eq!(sanitize_timeline_id("restoration-pass_2"), "restoration-pass_2");
        assert_eq!(sanitize_timeline_id("a/b c"), "a_b_c");
    }
}
