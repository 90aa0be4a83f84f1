//! Upload ingestion orchestration.
//!
//! One upload flows through: extension filter, durable original write,
//! signature verification, classification, primary-row registration, layer
//! extraction, derivative synthesis, and the catalog image-list update.
//! The original is registered before any derivative work; a derivative
//! failure never rolls it back (partial success is a terminal state).

use std::path::Path;
use std::sync::Arc;

use reliquary_core::error::CoreError;
use reliquary_core::format::{is_accepted_extension, Category};
use reliquary_core::pathguard::confine;
use reliquary_core::signature::{verify_signature, SIGNATURE_HEADER_LEN};
use reliquary_core::types::DbId;
use reliquary_db::models::asset::CreateImageAsset;
use reliquary_db::repositories::{ArtifactRepo, AssetRepo};
use reliquary_db::DbPool;

use crate::annotations::AnnotationStore;
use crate::derivative::{self, SynthesisRequest};
use crate::error::{PipelineError, PipelineResult};
use crate::fsio;
use crate::layers::extract_layers;

/// An uploaded file as received from the HTTP boundary.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The client-supplied file name.
    pub file_name: String,
    /// The declared media type.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The canonical asset of a completed ingestion: the preview when one was
/// synthesized, the original otherwise.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestResponse {
    pub file_path: String,
    pub file_name: String,
}

/// Ingest one uploaded file for an artifact.
pub async fn ingest_image(
    store: &AnnotationStore,
    pool: &DbPool,
    artifact_id: DbId,
    upload: UploadedFile,
) -> PipelineResult<IngestResponse> {
    // Validation happens before any I/O.
    if upload.bytes.is_empty() {
        return Err(CoreError::Validation("uploaded file is empty".to_string()).into());
    }
    if !is_accepted_extension(&upload.file_name) {
        return Err(CoreError::Validation(format!(
            "file type of '{}' is not accepted",
            upload.file_name
        ))
        .into());
    }
    if ArtifactRepo::find_by_id(pool, artifact_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "Artifact",
            id: artifact_id,
        }
        .into());
    }

    let category = Category::classify(&upload.file_name, &upload.mime_type);

    let stored_name = stored_file_name(&upload.file_name);
    let rel_dir = format!("artifacts/{artifact_id}");
    let rel_path = format!("{rel_dir}/{stored_name}");
    let abs_path = confine(store.upload_root(), &rel_path)?;

    // The original hits the disk first; everything after verification
    // references a durable file.
    fsio::write_durable(&abs_path, &upload.bytes).await?;

    // Signature check for the families that carry one. Vector markup and
    // the design/illustration program formats pass on the upload filter's
    // extension restriction (see DESIGN.md).
    let signature_checked = matches!(
        category,
        Category::Raster | Category::LayeredRaster | Category::PageDescription
    );
    if signature_checked {
        let header = &upload.bytes[..upload.bytes.len().min(SIGNATURE_HEADER_LEN)];
        if let Err(err) = verify_signature(header, &upload.mime_type) {
            tokio::fs::remove_file(&abs_path).await.ok();
            tracing::warn!(
                artifact_id,
                file_name = %upload.file_name,
                claimed = %upload.mime_type,
                "Upload rejected: signature mismatch; original deleted"
            );
            return Err(err.into());
        }
    }

    // Record the primary original before any derivative is attempted.
    AssetRepo::create(
        pool,
        artifact_id,
        &CreateImageAsset {
            file_path: rel_path.clone(),
            file_name: upload.file_name.clone(),
            file_size: Some(upload.bytes.len() as i64),
            mime_type: Some(upload.mime_type.clone()),
            is_primary: true,
            annotation: None,
        },
    )
    .await?;

    // Structured formats seed the annotation editor with one layer per
    // structural unit, stored on the primary original.
    if let Some(manifest) = extract_layers(&upload.bytes, category) {
        store.put(pool, artifact_id, &rel_path, &manifest).await?;
    }

    let stem = match stored_name.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => stored_name.clone(),
    };
    let abs_dir = abs_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let set = match derivative::synthesize(SynthesisRequest {
        original_bytes: Arc::new(upload.bytes),
        original_abs: &abs_path,
        abs_dir: &abs_dir,
        rel_dir: &rel_dir,
        stem: &stem,
        category,
    })
    .await
    {
        Ok(set) => set,
        Err(err) => {
            // The original stays registered; surface the required-derivative
            // failure after keeping the display list consistent.
            let _ = ArtifactRepo::append_image(pool, artifact_id, &rel_path).await?;
            return Err(PipelineError::Core(err));
        }
    };

    for derived in [&set.preview, &set.thumbnail].into_iter().flatten() {
        AssetRepo::create(
            pool,
            artifact_id,
            &CreateImageAsset {
                file_path: derived.rel_path.clone(),
                file_name: derived.file_name.clone(),
                file_size: Some(derived.file_size as i64),
                mime_type: Some(derived.mime_type.to_string()),
                is_primary: false,
                annotation: None,
            },
        )
        .await?;
    }

    // The preview, when present, becomes the canonical asset of this upload.
    let (canonical_path, canonical_name) = match &set.preview {
        Some(preview) => (preview.rel_path.clone(), preview.file_name.clone()),
        None => (rel_path.clone(), upload.file_name.clone()),
    };

    let _ = ArtifactRepo::append_image(pool, artifact_id, &canonical_path).await?;

    tracing::info!(
        artifact_id,
        category = category.as_str(),
        original = %rel_path,
        canonical = %canonical_path,
        preview = set.preview.is_some(),
        thumbnail = set.thumbnail.is_some(),
        "Image ingested"
    );

    Ok(IngestResponse {
        file_path: canonical_path,
        file_name: canonical_name,
    })
}

/// Remove an asset: its row, its file, and its display-list entry.
///
/// The path runs through the same confinement as every other filesystem
/// boundary. Derivative rows for the same upload are left untouched; they
/// are cleaned up with the artifact itself.
pub async fn delete_image(
    store: &AnnotationStore,
    pool: &DbPool,
    artifact_id: DbId,
    image_path: &str,
) -> PipelineResult<()> {
    let abs_path = confine(store.upload_root(), image_path)?;

    let asset = AssetRepo::find_by_path(pool, artifact_id, image_path)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImageAsset",
            id: artifact_id,
        })?;

    AssetRepo::delete(pool, asset.id).await?;
    let _ = ArtifactRepo::remove_image(pool, artifact_id, image_path).await?;

    if let Err(err) = tokio::fs::remove_file(&abs_path).await {
        // The row is gone; a leftover file is an orphan, not a dangling
        // reference.
        tracing::warn!(artifact_id, image_path, error = %err, "Asset file removal failed");
    }

    tracing::info!(artifact_id, image_path, "Asset deleted");
    Ok(())
}

/// Collision-resistant storage name: a short random token prefixed to the
/// sanitized client name.
fn stored_file_name(original: &str) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", &token[..8], sanitize_file_name(original))
}

/// Strip path separators and shell-hostile characters from a client name.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("dir\\photo.png"), "photo.png");
    }

    #[test]
    fn sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize_file_name("a photo (1).png"), "a_photo__1_.png");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
    }

    #[test]
    fn stored_name_keeps_extension_and_varies() {
        let a = stored_file_name("vase.tif");
        let b = stored_file_name("vase.tif");
        assert!(a.ends_with("_vase.tif"));
        assert_ne!(a, b);
    }
}
