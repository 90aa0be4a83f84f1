//! Layer/page manifest extraction for structured formats.
//!
//! Formats that carry internal structure seed the annotation editor with
//! one layer per structural unit: design documents contribute their
//! paintable layers, layered rasters one synthetic layer per page. The
//! manifest is stored as the primary original's annotation payload.

use std::io::Cursor;

use reliquary_core::annotation::{layer_manifest, AnnotationLayer};
use reliquary_core::format::Category;
use serde_json::Value;
use tiff::decoder::Decoder;

/// Extract a layer manifest for the given upload, or `None` for formats
/// without internal structure.
///
/// Design-document parse failures yield `None`: ingestion proceeds without
/// layer metadata rather than failing the upload.
pub fn extract_layers(bytes: &[u8], category: Category) -> Option<Value> {
    match category {
        Category::DesignDocument => design_layers(bytes),
        Category::LayeredRaster => Some(page_layers(bytes)),
        _ => None,
    }
}

/// One layer per paintable node of the design document, in document order.
fn design_layers(bytes: &[u8]) -> Option<Value> {
    let doc = match psd::Psd::from_bytes(bytes) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, "Design document layer parse failed; skipping manifest");
            return None;
        }
    };

    let layers: Vec<AnnotationLayer> = doc
        .layers()
        .iter()
        .enumerate()
        .map(|(idx, layer)| {
            AnnotationLayer::at_position(idx + 1, Some(layer.name()), layer.visible())
        })
        .collect();

    Some(layer_manifest(layers))
}

/// One synthetic `Page <n>` layer per TIFF directory, all visible.
fn page_layers(bytes: &[u8]) -> Value {
    let pages = tiff_page_count(bytes);
    let layers: Vec<AnnotationLayer> = (1..=pages)
        .map(|n| AnnotationLayer::at_position(n, Some(&format!("Page {n}")), true))
        .collect();
    layer_manifest(layers)
}

/// Count the directories (pages) of a TIFF file, defaulting to 1 when the
/// count cannot be determined.
fn tiff_page_count(bytes: &[u8]) -> usize {
    let mut decoder = match Decoder::new(Cursor::new(bytes)) {
        Ok(decoder) => decoder,
        Err(_) => return 1,
    };

    let mut count = 1;
    while decoder.more_images() {
        if decoder.next_image().is_err() {
            break;
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::colortype::Gray8;
    use tiff::encoder::TiffEncoder;

    fn multi_page_tiff(pages: usize) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut out).unwrap();
            for _ in 0..pages {
                let data = vec![128u8; 8 * 8];
                encoder.write_image::<Gray8>(8, 8, &data).unwrap();
            }
        }
        out.into_inner()
    }

    #[test]
    fn three_page_tiff_yields_three_page_layers() {
        let manifest = extract_layers(&multi_page_tiff(3), Category::LayeredRaster).unwrap();
        assert_eq!(manifest["version"], "2.0");
        assert_eq!(manifest["imageRotation"], 0);

        let layers = manifest["layers"].as_array().unwrap();
        assert_eq!(layers.len(), 3);
        for (idx, layer) in layers.iter().enumerate() {
            let n = idx + 1;
            assert_eq!(layer["id"], format!("layer-{n}"));
            assert_eq!(layer["name"], format!("Page {n}"));
            assert_eq!(layer["visible"], true);
            assert_eq!(layer["objects"].as_array().unwrap().len(), 0);
        }
    }

    #[test]
    fn single_page_tiff_yields_one_layer() {
        let manifest = extract_layers(&multi_page_tiff(1), Category::LayeredRaster).unwrap();
        assert_eq!(manifest["layers"].as_array().unwrap().len(), 1);
        assert_eq!(manifest["layers"][0]["name"], "Page 1");
    }

    #[test]
    fn undeterminable_page_count_defaults_to_one() {
        let manifest = extract_layers(b"II*\0 truncated", Category::LayeredRaster).unwrap();
        assert_eq!(manifest["layers"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn design_document_parse_failure_yields_none() {
        assert!(extract_layers(b"8BPS but not really", Category::DesignDocument).is_none());
    }

    #[test]
    fn flat_formats_yield_no_manifest() {
        for category in [
            Category::Raster,
            Category::VectorMarkup,
            Category::PageDescription,
            Category::VectorProgram,
        ] {
            assert!(extract_layers(b"irrelevant", category).is_none(), "{category:?}");
        }
    }
}
