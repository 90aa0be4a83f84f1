//! Durable filesystem helpers.
//!
//! Derivative and export files must be flushed before the catalog row
//! referencing them is committed; a crash between the two leaves an orphan
//! file, never a dangling row.

use std::path::Path;

use tokio::io::AsyncWriteExt;

/// Write `bytes` to `path` and flush to stable storage.
pub async fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Flush an already-written file (e.g. output of an external rasterizer)
/// to stable storage.
pub async fn sync_existing(path: &Path) -> std::io::Result<()> {
    let file = tokio::fs::File::open(path).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_durable_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.bin");
        write_durable(&path, b"payload").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn sync_existing_flushes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, b"x").unwrap();
        sync_existing(&path).await.unwrap();
    }
}
