//! Path confinement for filesystem boundaries.
//!
//! Every filesystem-facing operation (annotation writes, protect/unprotect,
//! frame recording, deletes) resolves caller-supplied paths through
//! [`confine`] so directory traversal outside the upload root is rejected
//! before any I/O happens.

use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// Resolve `candidate` relative to `root`, rejecting any path that would
/// escape the root after lexical normalization.
///
/// `candidate` must be relative; absolute paths and drive prefixes are
/// rejected outright. `.` segments are dropped and `..` segments may only
/// pop components that `candidate` itself introduced.
pub fn confine(root: &Path, candidate: &str) -> Result<PathBuf, CoreError> {
    if candidate.is_empty() {
        return Err(CoreError::Validation("path must not be empty".to_string()));
    }

    let mut resolved = root.to_path_buf();
    let mut depth: usize = 0;

    for component in Path::new(candidate).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(CoreError::Validation(format!(
                        "path '{candidate}' escapes the upload root"
                    )));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::Validation(format!(
                    "path '{candidate}' must be relative to the upload root"
                )));
            }
        }
    }

    Ok(resolved)
}

/// The final path segment of a relative path, used as a derived file name.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
