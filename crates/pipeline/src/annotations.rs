//! The annotation store: persistence of per-asset annotation documents.
//!
//! Reads normalize across three schema generations plus the legacy
//! free-form array; writes upsert on the `(artifact_id, file_path)` key.
//! When an encryption key is configured the serialized document is wrapped
//! in a crypto envelope and the envelope is what gets persisted, so the
//! stored value's top-level shape is always the envelope once encryption
//! is on.
//!
//! Whether encryption is on is decided once at construction and holds for
//! the store's whole lifetime; flipping it requires an explicit migration
//! pass over existing rows.

use std::path::{Path, PathBuf};

use reliquary_core::annotation::{AnnotationDocument, AnnotationRead};
use reliquary_core::envelope::{is_envelope, Envelope, EnvelopeKey};
use reliquary_core::error::CoreError;
use reliquary_core::pathguard::{confine, file_name_of};
use reliquary_core::types::DbId;
use reliquary_db::models::asset::CreateImageAsset;
use reliquary_db::repositories::AssetRepo;
use reliquary_db::DbPool;
use serde_json::Value;

use crate::error::PipelineResult;

/// Mediates all reads and writes of annotation documents.
pub struct AnnotationStore {
    key: Option<EnvelopeKey>,
    upload_root: PathBuf,
}

impl AnnotationStore {
    /// Construct the store.
    ///
    /// `key` is the process-wide annotation-at-rest key; `None` disables
    /// encryption for this store's lifetime.
    pub fn new(key: Option<EnvelopeKey>, upload_root: impl Into<PathBuf>) -> Self {
        Self {
            key,
            upload_root: upload_root.into(),
        }
    }

    /// Whether documents are encrypted before persistence.
    pub fn encryption_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Wrap a document for persistence.
    ///
    /// With encryption off this is the identity; with it on, the returned
    /// value is the serialized envelope.
    pub fn seal(&self, document: &Value) -> Result<Value, CoreError> {
        match &self.key {
            None => Ok(document.clone()),
            Some(key) => {
                let plaintext = serde_json::to_vec(document)
                    .map_err(|e| CoreError::Internal(format!("annotation serialization: {e}")))?;
                let envelope = key.encrypt(&plaintext)?;
                serde_json::to_value(envelope)
                    .map_err(|e| CoreError::Internal(format!("envelope serialization: {e}")))
            }
        }
    }

    /// Unwrap a stored value.
    ///
    /// Envelope-shaped values are decrypted with the process key;
    /// decryption failure propagates. Plaintext values pass through, which
    /// keeps rows written before encryption was enabled readable.
    pub fn unseal(&self, stored: &Value) -> Result<Value, CoreError> {
        if !is_envelope(stored) {
            return Ok(stored.clone());
        }

        let key = self.key.as_ref().ok_or(CoreError::Decryption)?;
        let envelope: Envelope =
            serde_json::from_value(stored.clone()).map_err(|_| CoreError::Decryption)?;
        let plaintext = key.decrypt(&envelope)?;
        serde_json::from_slice(&plaintext).map_err(|_| CoreError::Decryption)
    }

    /// Read the annotation document stored for `(artifact_id, image_path)`.
    ///
    /// An absent row or payload reads as empty; an unrecognized shape also
    /// reads as empty rather than failing.
    pub async fn get(
        &self,
        pool: &DbPool,
        artifact_id: DbId,
        image_path: &str,
    ) -> PipelineResult<AnnotationRead> {
        let asset = AssetRepo::find_by_path(pool, artifact_id, image_path).await?;

        let Some(stored) = asset.and_then(|a| a.annotation) else {
            return Ok(AnnotationRead::empty());
        };

        let document = self.unseal(&stored)?;
        Ok(AnnotationDocument::classify(document).into())
    }

    /// Upsert the annotation document for `(artifact_id, image_path)`.
    ///
    /// The path must stay inside this artifact's asset directory; anything
    /// else is rejected before any I/O. Returns the canonical asset key.
    /// Concurrent writers are linearized by the store; last write wins.
    pub async fn put(
        &self,
        pool: &DbPool,
        artifact_id: DbId,
        image_path: &str,
        document: &Value,
    ) -> PipelineResult<String> {
        self.check_artifact_path(artifact_id, image_path)?;

        let stored = self.seal(document)?;

        let updated = AssetRepo::set_annotation(pool, artifact_id, image_path, &stored).await?;
        if updated.is_none() {
            AssetRepo::create(
                pool,
                artifact_id,
                &CreateImageAsset {
                    file_path: image_path.to_string(),
                    file_name: file_name_of(image_path).to_string(),
                    file_size: None,
                    mime_type: None,
                    is_primary: false,
                    annotation: Some(stored),
                },
            )
            .await?;
        }

        tracing::debug!(
            artifact_id,
            image_path,
            encrypted = self.encryption_enabled(),
            "Annotation document stored"
        );

        Ok(image_path.to_string())
    }

    /// Reject paths outside the artifact's asset directory.
    fn check_artifact_path(&self, artifact_id: DbId, image_path: &str) -> Result<(), CoreError> {
        let resolved = confine(&self.upload_root, image_path)?;
        let artifact_dir = self.upload_root.join("artifacts").join(artifact_id.to_string());
        if !resolved.starts_with(&artifact_dir) {
            return Err(CoreError::Validation(format!(
                "path '{image_path}' is outside the artifact's asset directory"
            )));
        }
        Ok(())
    }
}
