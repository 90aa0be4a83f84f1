//! Magic-byte verification of uploaded files.
//!
//! Confirms that the first bytes of an upload match the signature of the
//! claimed media type before any catalog record is created. The caller is
//! responsible for deleting an already-written file when verification fails.

use crate::error::CoreError;

/// Number of leading bytes inspected by [`verify_signature`].
pub const SIGNATURE_HEADER_LEN: usize = 16;

/// PNG signature: `89 50 4E 47`.
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];

/// JPEG signature: `FF D8`.
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];

/// GIF signature: ASCII `GIF`.
const GIF_MAGIC: &[u8] = b"GIF";

/// TIFF little-endian signature: `II*\0`.
const TIFF_LE_MAGIC: &[u8] = &[0x49, 0x49, 0x2A, 0x00];

/// TIFF big-endian signature: `MM\0*`.
const TIFF_BE_MAGIC: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];

/// PDF signature: ASCII `%PDF`.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Verify that `header` (the first bytes of the file, up to
/// [`SIGNATURE_HEADER_LEN`]) matches the signature family of `claimed_mime`.
///
/// WEBP is accepted on the claim alone; the container signature is not
/// checked. Any claimed type outside the known families is rejected.
pub fn verify_signature(header: &[u8], claimed_mime: &str) -> Result<(), CoreError> {
    let mime = claimed_mime.to_ascii_lowercase();

    let ok = match mime.as_str() {
        "image/png" => header.starts_with(PNG_MAGIC),
        "image/jpeg" | "image/jpg" => header.starts_with(JPEG_MAGIC),
        "image/gif" => header.starts_with(GIF_MAGIC),
        "image/tiff" | "image/tif" => {
            header.starts_with(TIFF_LE_MAGIC) || header.starts_with(TIFF_BE_MAGIC)
        }
        "application/pdf" => header.starts_with(PDF_MAGIC),
        // WEBP containers are accepted by claim alone.
        "image/webp" => true,
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(CoreError::SignatureMismatch(claimed_mime.to_string()))
    }
}
