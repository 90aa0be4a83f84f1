//! External rasterizer invocation for document formats.
//!
//! Page-description (PDF) and vector-program (AI/PostScript) inputs are
//! rasterized by shelling out to `pdftoppm` and `gs`. Only the first page
//! is rendered; previews exist to give the catalog a displayable image,
//! not to replace the document.

use std::path::Path;

use reliquary_core::error::CoreError;

/// Error type for external rasterizer operations.
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("rasterizer binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("rasterizer execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("rasterizer exited successfully but produced no output file")]
    MissingOutput,

    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RasterizeError> for CoreError {
    fn from(err: RasterizeError) -> Self {
        CoreError::Transcode(err.to_string())
    }
}

/// Rasterize the first page of a PDF to a PNG at the given DPI.
///
/// Runs `pdftoppm -png -r <dpi> -singlefile -f 1 -l 1`.
pub async fn pdf_to_png(input: &Path, output: &Path, dpi: u32) -> Result<(), RasterizeError> {
    if !input.exists() {
        return Err(RasterizeError::InputNotFound(
            input.to_string_lossy().to_string(),
        ));
    }

    // pdftoppm appends `.png` itself; pass the output path without it.
    let prefix = output.with_extension("");

    let result = tokio::process::Command::new("pdftoppm")
        .args(["-png", "-r", &dpi.to_string(), "-singlefile", "-f", "1", "-l", "1"])
        .arg(input)
        .arg(&prefix)
        .output()
        .await
        .map_err(RasterizeError::NotFound)?;

    if !result.status.success() {
        return Err(RasterizeError::ExecutionFailed {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    if !output.exists() {
        return Err(RasterizeError::MissingOutput);
    }

    Ok(())
}

/// Rasterize the first page of a PostScript-family document (AI) to a PNG
/// at the given DPI via Ghostscript.
pub async fn postscript_to_png(
    input: &Path,
    output: &Path,
    dpi: u32,
) -> Result<(), RasterizeError> {
    if !input.exists() {
        return Err(RasterizeError::InputNotFound(
            input.to_string_lossy().to_string(),
        ));
    }

    let result = tokio::process::Command::new("gs")
        .args([
            "-dBATCH",
            "-dNOPAUSE",
            "-dQUIET",
            "-dFirstPage=1",
            "-dLastPage=1",
            "-sDEVICE=png16m",
        ])
        .arg(format!("-r{dpi}"))
        .arg(format!("-sOutputFile={}", output.display()))
        .arg(input)
        .output()
        .await
        .map_err(RasterizeError::NotFound)?;

    if !result.status.success() {
        return Err(RasterizeError::ExecutionFailed {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    if !output.exists() {
        return Err(RasterizeError::MissingOutput);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_input_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let err = pdf_to_png(
            &dir.path().join("absent.pdf"),
            &dir.path().join("out.png"),
            300,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RasterizeError::InputNotFound(_)));

        let err = postscript_to_png(
            &dir.path().join("absent.ai"),
            &dir.path().join("out.png"),
            300,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RasterizeError::InputNotFound(_)));
    }

    #[test]
    fn rasterize_error_maps_to_transcode() {
        let err: CoreError = RasterizeError::MissingOutput.into();
        assert!(matches!(err, CoreError::Transcode(_)));
    }
}
