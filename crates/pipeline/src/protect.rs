//! Protected export/import of original files.
//!
//! `protect_file` wraps an artifact-scoped file in a password-encrypted
//! envelope with integrity metadata and records the wrapper as a
//! non-primary asset. `unprotect_file` reverses the operation. A wrong
//! password surfaces as a decryption failure, never as silent corruption.
//! Role gating and rate limiting are the HTTP layer's concern; the core
//! only enforces the minimum password length.

use std::path::Path;

use reliquary_core::error::CoreError;
use reliquary_core::format::extension_of;
use reliquary_core::pathguard::confine;
use reliquary_core::protect::{validate_password, ProtectedFile, PROTECTED_SUFFIX};
use reliquary_core::types::DbId;
use reliquary_db::models::asset::CreateImageAsset;
use reliquary_db::repositories::{ArtifactRepo, AssetRepo};
use reliquary_db::DbPool;

use crate::error::PipelineResult;
use crate::fsio;

/// Result of a successful protect operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProtectOutcome {
    /// Wrapper path relative to the upload root.
    pub protected_path: String,
    pub file_name: String,
}

/// Result of a successful unprotect operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UnprotectOutcome {
    /// Restored file path relative to the upload root.
    pub restored_path: String,
    pub file_name: String,
}

/// Encrypt the named file under `password` and record the wrapper.
pub async fn protect_file(
    pool: &DbPool,
    upload_root: &Path,
    artifact_id: DbId,
    file_path: &str,
    password: &str,
) -> PipelineResult<ProtectOutcome> {
    validate_password(password)?;

    let abs_path = confine(upload_root, file_path)?;
    ensure_artifact_exists(pool, artifact_id).await?;

    let original = tokio::fs::read(&abs_path).await?;
    let ext = extension_of(file_path).to_ascii_lowercase();
    let wrapper = ProtectedFile::seal(&original, &ext, password)?;

    let serialized = serde_json::to_vec_pretty(&wrapper)
        .map_err(|e| CoreError::Internal(format!("wrapper serialization: {e}")))?;

    let protected_rel = protected_path_for(file_path);
    let protected_abs = confine(upload_root, &protected_rel)?;
    fsio::write_durable(&protected_abs, &serialized).await?;

    let file_name = reliquary_core::pathguard::file_name_of(&protected_rel).to_string();
    AssetRepo::create(
        pool,
        artifact_id,
        &CreateImageAsset {
            file_path: protected_rel.clone(),
            file_name: file_name.clone(),
            file_size: Some(serialized.len() as i64),
            mime_type: Some("application/json".to_string()),
            is_primary: false,
            annotation: None,
        },
    )
    .await?;

    tracing::info!(artifact_id, path = %protected_rel, "Protected export written");

    Ok(ProtectOutcome {
        protected_path: protected_rel,
        file_name,
    })
}

/// Decrypt a protected wrapper and restore the original file.
pub async fn unprotect_file(
    pool: &DbPool,
    upload_root: &Path,
    artifact_id: DbId,
    protected_path: &str,
    password: &str,
) -> PipelineResult<UnprotectOutcome> {
    validate_password(password)?;

    let abs_path = confine(upload_root, protected_path)?;
    ensure_artifact_exists(pool, artifact_id).await?;

    let serialized = tokio::fs::read(&abs_path).await?;
    let wrapper: ProtectedFile = serde_json::from_slice(&serialized).map_err(|_| {
        CoreError::Validation("file is not a protected wrapper".to_string())
    })?;

    let original = wrapper.open(password)?;

    let restored_rel = restored_path_for(protected_path, &wrapper.meta.original_ext);
    let restored_abs = confine(upload_root, &restored_rel)?;
    fsio::write_durable(&restored_abs, &original).await?;

    tracing::info!(artifact_id, path = %restored_rel, "Protected export restored");

    Ok(UnprotectOutcome {
        file_name: reliquary_core::pathguard::file_name_of(&restored_rel).to_string(),
        restored_path: restored_rel,
    })
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

/// `artifacts/7/vase.tif` -> `artifacts/7/vase.protected.json`
fn protected_path_for(file_path: &str) -> String {
    let stem = match file_path.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_path,
    };
    format!("{stem}{PROTECTED_SUFFIX}")
}

/// `artifacts/7/vase.protected.json` + `tif` -> `artifacts/7/vase_restored.tif`
fn restored_path_for(protected_path: &str, original_ext: &str) -> String {
    let stem = protected_path
        .strip_suffix(PROTECTED_SUFFIX)
        .unwrap_or_else(|| {
            protected_path
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(protected_path)
        });
    if original_ext.is_empty() {
        format!("{stem}_restored")
    } else {
        format!("{stem}_restored.{original_ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_path_replaces_extension() {
        assert_eq!(
            protected_path_for("artifacts/7/vase.tif"),
            "artifacts/7/vase.protected.json"
        );
        assert_eq!(protected_path_for("noext"), "noext.protected.json");
    }

    #[test]
    fn restored_path_carries_original_extension() {
        assert_eq!(
            restored_path_for("artifacts/7/vase.protected.json", "tif"),
            "artifacts/7/vase_restored.tif"
        );
        assert_eq!(
            restored_path_for("artifacts/7/vase.protected.json", ""),
            "artifacts/7/vase_restored"
        );
    }
}
