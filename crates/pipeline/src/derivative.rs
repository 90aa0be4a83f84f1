//! Derivative asset synthesis: previews and thumbnails.
//!
//! The original is always recorded before any derivative work starts, so a
//! failure here never unregisters it. A preview is synthesized per the
//! format rules below; a thumbnail is always attempted and its failure is
//! swallowed. CPU-bound transcoding runs on the blocking pool; document
//! rasterization shells out to external tools.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reliquary_core::error::CoreError;
use reliquary_core::format::Category;

use crate::fsio;
use crate::rasterize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A raster original wider or taller than this gets a resized preview.
pub const PREVIEW_TRIGGER_DIMENSION: u32 = 4000;

/// A raster original larger than this (20 MiB) gets a resized preview.
pub const PREVIEW_TRIGGER_BYTES: u64 = 20 * 1024 * 1024;

/// Maximum dimension of a resized preview; aspect ratio is preserved and
/// images are never upscaled.
pub const PREVIEW_MAX_DIMENSION: u32 = 3000;

/// Thumbnails are a fixed cover-cropped square of this size.
pub const THUMBNAIL_SIZE: u32 = 512;

/// JPEG quality for thumbnail re-encoding.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;

/// DPI for rasterizing page-description and vector-program documents.
pub const DOCUMENT_RASTER_DPI: u32 = 300;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A derivative file written to disk, ready to be recorded as a
/// non-primary asset row.
#[derive(Debug, Clone)]
pub struct DerivedFile {
    /// Path relative to the upload root.
    pub rel_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: &'static str,
}

/// The synthesized derivatives for one upload.
#[derive(Debug, Clone, Default)]
pub struct DerivativeSet {
    /// Present when the preview rules triggered; becomes the canonical
    /// response path for the upload.
    pub preview: Option<DerivedFile>,
    /// Always attempted; `None` means generation failed and was swallowed.
    pub thumbnail: Option<DerivedFile>,
}

/// Inputs for one synthesis run.
pub struct SynthesisRequest<'a> {
    /// The original file's bytes.
    pub original_bytes: Arc<Vec<u8>>,
    /// Absolute path of the original on disk (rasterizer input).
    pub original_abs: &'a Path,
    /// Absolute directory derivatives are written into.
    pub abs_dir: &'a Path,
    /// Same directory relative to the upload root.
    pub rel_dir: &'a str,
    /// File stem used to name derivatives.
    pub stem: &'a str,
    pub category: Category,
}

// ---------------------------------------------------------------------------
// Preview rules
// ---------------------------------------------------------------------------

/// Header-only dimension probe; `None` when the format cannot be decoded.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Whether the preview rules trigger for this upload.
///
/// Document and structured formats always get a preview; flat rasters only
/// when oversized in pixels or bytes.
pub fn preview_required(
    category: Category,
    dimensions: Option<(u32, u32)>,
    byte_size: u64,
) -> bool {
    match category {
        Category::Raster => {
            let oversized = dimensions
                .is_some_and(|(w, h)| w > PREVIEW_TRIGGER_DIMENSION || h > PREVIEW_TRIGGER_DIMENSION);
            oversized || byte_size > PREVIEW_TRIGGER_BYTES
        }
        Category::LayeredRaster
        | Category::PageDescription
        | Category::VectorMarkup
        | Category::DesignDocument
        | Category::VectorProgram => true,
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Synthesize the derivative set for one accepted upload.
///
/// Preview failures for page-description, vector-markup, and
/// design-document inputs are surfaced; the vector-program preview degrades
/// to a verbatim copy, and thumbnail failure is always swallowed.
pub async fn synthesize(req: SynthesisRequest<'_>) -> Result<DerivativeSet, CoreError> {
    let dimensions = probe_dimensions(&req.original_bytes);
    let byte_size = req.original_bytes.len() as u64;

    let preview = if preview_required(req.category, dimensions, byte_size) {
        Some(make_preview(&req).await?)
    } else {
        None
    };

    let thumbnail = match make_thumbnail(&req, preview.as_ref()).await {
        Ok(thumb) => Some(thumb),
        Err(err) => {
            tracing::warn!(
                stem = req.stem,
                category = req.category.as_str(),
                error = %err,
                "Thumbnail generation failed; continuing without one"
            );
            None
        }
    };

    Ok(DerivativeSet { preview, thumbnail })
}

async fn make_preview(req: &SynthesisRequest<'_>) -> Result<DerivedFile, CoreError> {
    let file_name = format!("{}_preview.png", req.stem);
    let abs_path = req.abs_dir.join(&file_name);

    match req.category {
        Category::PageDescription => {
            rasterize::pdf_to_png(req.original_abs, &abs_path, DOCUMENT_RASTER_DPI).await?;
            fsio::sync_existing(&abs_path).await?;
        }
        Category::VectorProgram => {
            match rasterize::postscript_to_png(req.original_abs, &abs_path, DOCUMENT_RASTER_DPI)
                .await
            {
                Ok(()) => fsio::sync_existing(&abs_path).await?,
                Err(err) => {
                    // Best-effort degradation: the original bytes stand in
                    // for the preview.
                    tracing::warn!(
                        stem = req.stem,
                        error = %err,
                        "Vector-program rasterization failed; copying original as preview"
                    );
                    let file_name = format!("{}_preview.ai", req.stem);
                    let abs_path = req.abs_dir.join(&file_name);
                    fsio::write_durable(&abs_path, &req.original_bytes).await?;
                    return Ok(DerivedFile {
                        rel_path: format!("{}/{file_name}", req.rel_dir),
                        file_name,
                        file_size: req.original_bytes.len() as u64,
                        mime_type: "application/postscript",
                    });
                }
            }
        }
        Category::VectorMarkup => {
            let bytes = Arc::clone(&req.original_bytes);
            let png = run_blocking(move || render_svg_png(&bytes)).await?;
            fsio::write_durable(&abs_path, &png).await?;
        }
        Category::DesignDocument => {
            let bytes = Arc::clone(&req.original_bytes);
            let png = run_blocking(move || {
                design_composite_png(&bytes).or_else(|err| {
                    // Composite decode failed; fall back to a straight
                    // lossless recompression of the original.
                    tracing::warn!(error = %err, "Design document composite decode failed");
                    resized_preview_png(&bytes)
                })
            })
            .await?;
            fsio::write_durable(&abs_path, &png).await?;
        }
        Category::Raster | Category::LayeredRaster => {
            let bytes = Arc::clone(&req.original_bytes);
            let png = run_blocking(move || resized_preview_png(&bytes)).await?;
            fsio::write_durable(&abs_path, &png).await?;
        }
    }

    let file_size = tokio::fs::metadata(&abs_path).await?.len();
    Ok(DerivedFile {
        rel_path: format!("{}/{file_name}", req.rel_dir),
        file_name,
        file_size,
        mime_type: "image/png",
    })
}

async fn make_thumbnail(
    req: &SynthesisRequest<'_>,
    preview: Option<&DerivedFile>,
) -> Result<DerivedFile, CoreError> {
    // Prefer the preview as the thumbnail source: for document formats the
    // original is not decodable by the raster pipeline.
    let source: Arc<Vec<u8>> = match preview {
        Some(p) if p.mime_type == "image/png" => {
            let abs = req.abs_dir.join(&p.file_name);
            Arc::new(tokio::fs::read(&abs).await?)
        }
        _ => Arc::clone(&req.original_bytes),
    };

    let jpeg = run_blocking(move || thumbnail_jpeg(&source)).await?;

    let file_name = format!("{}_thumb.jpg", req.stem);
    let abs_path = req.abs_dir.join(&file_name);
    fsio::write_durable(&abs_path, &jpeg).await?;

    Ok(DerivedFile {
        rel_path: format!("{}/{file_name}", req.rel_dir),
        file_name,
        file_size: jpeg.len() as u64,
        mime_type: "image/jpeg",
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, CoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("transcode task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// Blocking transcode primitives
// ---------------------------------------------------------------------------

/// Re-encode a raster image as PNG, resizing so neither dimension exceeds
/// [`PREVIEW_MAX_DIMENSION`]. Aspect ratio is preserved; images already
/// within bounds are recompressed without resizing.
pub(crate) fn resized_preview_png(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Transcode(format!("preview decode failed: {e}")))?;

    let img = if img.width() > PREVIEW_MAX_DIMENSION || img.height() > PREVIEW_MAX_DIMENSION {
        img.resize(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        img
    };

    encode_png(&img)
}

/// Cover-crop to a [`THUMBNAIL_SIZE`] square and re-encode as JPEG.
pub(crate) fn thumbnail_jpeg(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Transcode(format!("thumbnail decode failed: {e}")))?;

    let thumb = img
        .resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), THUMBNAIL_JPEG_QUALITY);
    DynamicImage::ImageRgb8(thumb)
        .write_with_encoder(encoder)
        .map_err(|e| CoreError::Transcode(format!("thumbnail encode failed: {e}")))?;
    Ok(out)
}

/// Rasterize SVG markup to PNG at its intrinsic size.
pub(crate) fn render_svg_png(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| CoreError::Transcode(format!("SVG parse failed: {e}")))?;

    let size = tree.size();
    let width = (size.width().ceil() as u32).max(1);
    let height = (size.height().ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CoreError::Transcode("SVG pixmap allocation failed".to_string()))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );

    let mut img = image::RgbaImage::new(width, height);
    for (pixel, out) in pixmap.pixels().iter().zip(img.pixels_mut()) {
        let c = pixel.demultiply();
        *out = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    encode_png(&DynamicImage::ImageRgba8(img))
}

/// Decode the flattened composite of a layered design document to PNG.
pub(crate) fn design_composite_png(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    let doc = psd::Psd::from_bytes(bytes)
        .map_err(|e| CoreError::Transcode(format!("design document parse failed: {e}")))?;

    let img = image::RgbaImage::from_raw(doc.width(), doc.height(), doc.rgba())
        .ok_or_else(|| {
            CoreError::Transcode("design document composite has inconsistent size".to_string())
        })?;
    encode_png(&DynamicImage::ImageRgba8(img))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| CoreError::Transcode(format!("PNG encode failed: {e}")))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 90, 60, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    // -- preview_required --------------------------------------------------

    #[test]
    fn small_raster_needs_no_preview() {
        assert!(!preview_required(Category::Raster, Some((800, 600)), 1024));
    }

    #[test]
    fn oversized_raster_needs_preview() {
        assert!(preview_required(Category::Raster, Some((4500, 600)), 1024));
        assert!(preview_required(Category::Raster, Some((600, 4500)), 1024));
    }

    #[test]
    fn dimension_exactly_at_trigger_needs_no_preview() {
        assert!(!preview_required(Category::Raster, Some((4000, 4000)), 1024));
    }

    #[test]
    fn heavy_raster_needs_preview() {
        assert!(preview_required(
            Category::Raster,
            Some((800, 600)),
            PREVIEW_TRIGGER_BYTES + 1
        ));
    }

    #[test]
    fn structured_formats_always_need_preview() {
        for category in [
            Category::LayeredRaster,
            Category::PageDescription,
            Category::VectorMarkup,
            Category::DesignDocument,
            Category::VectorProgram,
        ] {
            assert!(preview_required(category, Some((10, 10)), 1), "{category:?}");
        }
    }

    // -- probe_dimensions --------------------------------------------------

    #[test]
    fn probe_reads_png_dimensions() {
        assert_eq!(probe_dimensions(&png_of(320, 200)), Some((320, 200)));
    }

    #[test]
    fn probe_returns_none_for_undecodable_input() {
        assert_eq!(probe_dimensions(b"%PDF-1.7 not an image"), None);
    }

    // -- resized_preview_png -----------------------------------------------

    #[test]
    fn preview_resizes_preserving_aspect_ratio() {
        let out = resized_preview_png(&png_of(5000, 3000)).unwrap();
        assert_eq!(probe_dimensions(&out), Some((3000, 1800)));
    }

    #[test]
    fn preview_never_upscales() {
        let out = resized_preview_png(&png_of(640, 480)).unwrap();
        assert_eq!(probe_dimensions(&out), Some((640, 480)));
    }

    #[test]
    fn preview_decode_failure_is_transcode_error() {
        assert!(matches!(
            resized_preview_png(b"garbage").unwrap_err(),
            CoreError::Transcode(_)
        ));
    }

    // -- thumbnail_jpeg ----------------------------------------------------

    #[test]
    fn thumbnail_is_exactly_square() {
        let out = thumbnail_jpeg(&png_of(5000, 3000)).unwrap();
        assert_eq!(probe_dimensions(&out), Some((THUMBNAIL_SIZE, THUMBNAIL_SIZE)));
    }

    #[test]
    fn thumbnail_covers_portrait_input_too() {
        let out = thumbnail_jpeg(&png_of(300, 900)).unwrap();
        assert_eq!(probe_dimensions(&out), Some((THUMBNAIL_SIZE, THUMBNAIL_SIZE)));
    }

    // -- render_svg_png ----------------------------------------------------

    #[test]
    fn svg_rasterizes_at_intrinsic_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="48">
            <rect width="64" height="48" fill="#803010"/></svg>"##;
        let out = render_svg_png(svg).unwrap();
        assert_eq!(probe_dimensions(&out), Some((64, 48)));
    }

    #[test]
    fn invalid_svg_is_transcode_error() {
        assert!(matches!(
            render_svg_png(b"<not-svg>").unwrap_err(),
            CoreError::Transcode(_)
        ));
    }

    // -- design_composite_png ----------------------------------------------

    #[test]
    fn invalid_design_document_is_transcode_error() {
        assert!(matches!(
            design_composite_png(b"not a psd").unwrap_err(),
            CoreError::Transcode(_)
        ));
    }

    // -- end-to-end synthesis ----------------------------------------------

    #[tokio::test]
    async fn oversized_raster_gets_preview_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_of(4500, 4500);
        let original_abs = dir.path().join("vessel.png");
        std::fs::write(&original_abs, &bytes).unwrap();

        let set = synthesize(SynthesisRequest {
            original_bytes: Arc::new(bytes),
            original_abs: &original_abs,
            abs_dir: dir.path(),
            rel_dir: "artifacts/1",
            stem: "vessel",
            category: Category::Raster,
        })
        .await
        .unwrap();

        let preview = set.preview.expect("preview should be produced");
        assert_eq!(preview.rel_path, "artifacts/1/vessel_preview.png");
        let preview_bytes = std::fs::read(dir.path().join(&preview.file_name)).unwrap();
        assert_eq!(probe_dimensions(&preview_bytes), Some((3000, 3000)));

        let thumb = set.thumbnail.expect("thumbnail should be produced");
        let thumb_bytes = std::fs::read(dir.path().join(&thumb.file_name)).unwrap();
        assert_eq!(probe_dimensions(&thumb_bytes), Some((512, 512)));
    }

    #[tokio::test]
    async fn small_raster_gets_thumbnail_only() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_of(640, 480);
        let original_abs = dir.path().join("shard.png");
        std::fs::write(&original_abs, &bytes).unwrap();

        let set = synthesize(SynthesisRequest {
            original_bytes: Arc::new(bytes),
            original_abs: &original_abs,
            abs_dir: dir.path(),
            rel_dir: "artifacts/1",
            stem: "shard",
            category: Category::Raster,
        })
        .await
        .unwrap();

        assert!(set.preview.is_none());
        assert!(set.thumbnail.is_some());
    }

    #[tokio::test]
    async fn undecodable_original_swallows_thumbnail_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"RIFF....WEBPgarbage".to_vec();
        let original_abs = dir.path().join("odd.webp");
        std::fs::write(&original_abs, &bytes).unwrap();

        let set = synthesize(SynthesisRequest {
            original_bytes: Arc::new(bytes),
            original_abs: &original_abs,
            abs_dir: dir.path(),
            rel_dir: "artifacts/1",
            stem: "odd",
            category: Category::Raster,
        })
        .await
        .unwrap();

        assert!(set.preview.is_none());
        assert!(set.thumbnail.is_none());
    }
}
