//! Processing-category classification for accepted uploads.
//!
//! Classification is extension/MIME driven, case-insensitive, and total:
//! the upload filter has already restricted extensions, so every accepted
//! file maps to exactly one category.

/// File extensions the ingestion boundary accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "tif", "tiff", "svg", "pdf", "psd", "ai",
];

/// Processing category of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Flat raster image (jpeg/png/gif/webp).
    Raster,
    /// Raster with internal page/layer structure (tiff).
    LayeredRaster,
    /// Vector markup (svg).
    VectorMarkup,
    /// Page-description document (pdf).
    PageDescription,
    /// Proprietary layered design document (psd).
    DesignDocument,
    /// Vector illustration-program document (ai).
    VectorProgram,
}

impl Category {
    /// Derive the processing category from a file name and declared MIME type.
    ///
    /// The extension wins when recognized; the MIME type is the fallback.
    /// Anything the upload filter let through that matches neither maps to
    /// [`Category::Raster`].
    pub fn classify(file_name: &str, mime_type: &str) -> Self {
        let ext = extension_of(file_name).to_ascii_lowercase();
        if let Some(cat) = Self::from_extension(&ext) {
            return cat;
        }
        Self::from_mime(&mime_type.to_ascii_lowercase()).unwrap_or(Self::Raster)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(Self::Raster),
            "tif" | "tiff" => Some(Self::LayeredRaster),
            "svg" => Some(Self::VectorMarkup),
            "pdf" => Some(Self::PageDescription),
            "psd" => Some(Self::DesignDocument),
            "ai" => Some(Self::VectorProgram),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp" => {
                Some(Self::Raster)
            }
            "image/tiff" | "image/tif" => Some(Self::LayeredRaster),
            "image/svg+xml" => Some(Self::VectorMarkup),
            "application/pdf" => Some(Self::PageDescription),
            "image/vnd.adobe.photoshop" | "application/x-photoshop" => Some(Self::DesignDocument),
            "application/postscript" | "application/illustrator" => Some(Self::VectorProgram),
            _ => None,
        }
    }

    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::LayeredRaster => "layered-raster",
            Self::VectorMarkup => "vector-markup",
            Self::PageDescription => "page-description",
            Self::DesignDocument => "design-document",
            Self::VectorProgram => "vector-program",
        }
    }
}

/// Extension of `file_name` as written, or `""` when it has none.
pub fn extension_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// Whether the upload filter accepts this file name's extension.
pub fn is_accepted_extension(file_name: &str) -> bool {
    let ext = extension_of(file_name).to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_extensions() {
        for name in ["a.jpg", "b.jpeg", "c.png", "d.gif", "e.webp"] {
            assert_eq!(Category::classify(name, ""), Category::Raster, "{name}");
        }
    }

    #[test]
    fn layered_raster_extensions() {
        assert_eq!(Category::classify("scan.tif", ""), Category::LayeredRaster);
        assert_eq!(Category::classify("scan.tiff", ""), Category::LayeredRaster);
    }

    #[test]
    fn document_extensions() {
        assert_eq!(Category::classify("plate.svg", ""), Category::VectorMarkup);
        assert_eq!(Category::classify("report.pdf", ""), Category::PageDescription);
        assert_eq!(Category::classify("mockup.psd", ""), Category::DesignDocument);
        assert_eq!(Category::classify("drawing.ai", ""), Category::VectorProgram);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(Category::classify("SCAN.TIFF", ""), Category::LayeredRaster);
        assert_eq!(Category::classify("photo.PNG", ""), Category::Raster);
        assert_eq!(
            Category::classify("unknown.bin", "IMAGE/SVG+XML"),
            Category::VectorMarkup
        );
    }

    #[test]
    fn mime_fallback_when_extension_unrecognized() {
        assert_eq!(
            Category::classify("upload", "application/pdf"),
            Category::PageDescription
        );
        assert_eq!(
            Category::classify("upload.dat", "image/vnd.adobe.photoshop"),
            Category::DesignDocument
        );
    }

    #[test]
    fn classification_is_total() {
        // Nothing recognizable still maps to a category.
        assert_eq!(Category::classify("file", ""), Category::Raster);
    }

    #[test]
    fn extension_beats_mime() {
        assert_eq!(
            Category::classify("photo.png", "application/pdf"),
            Category::Raster
        );
    }

    #[test]
    fn accepted_extension_filter() {
        assert!(is_accepted_extension("a.png"));
        assert!(is_accepted_extension("a.PSD"));
        assert!(!is_accepted_extension("a.exe"));
        assert!(!is_accepted_extension("noext"));
    }
}
