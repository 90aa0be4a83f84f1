//! Timelapse frame sidecar payloads and data-URL decoding.
//!
//! A timeline is a caller-defined grouping key, not a stored entity: frames
//! are ordinary non-primary assets whose annotation payload carries a
//! sidecar `{timeline_id, step_index, annotations}`. Ordering is defined
//! solely by `step_index` ascending, ties broken by storage order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Annotation sidecar stored on a timelapse frame asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameSidecar {
    pub timeline_id: String,
    #[serde(default)]
    pub step_index: i64,
    #[serde(default)]
    pub annotations: Value,
}

/// Parse a stored annotation payload as a frame sidecar.
///
/// Returns `None` for payloads that are not sidecars (layer manifests,
/// legacy annotation documents), which the frame listing skips.
pub fn parse_sidecar(payload: &Value) -> Option<FrameSidecar> {
    if payload.get("timeline_id").map(Value::is_string) != Some(true) {
        return None;
    }
    serde_json::from_value(payload.clone()).ok()
}

/// Sort frames ascending by step index, stable on ties.
pub fn sort_by_step<T>(frames: &mut [(i64, T)]) {
    frames.sort_by_key(|(step, _)| *step);
}

// ---------------------------------------------------------------------------
// Data-URL decoding
// ---------------------------------------------------------------------------

/// Decode a `data:` URL carrying a PNG or JPEG frame capture.
///
/// Returns the raw bytes and the file extension for the decoded encoding.
/// Any other media type or malformed URL is a validation failure.
pub fn decode_frame_data_url(data_url: &str) -> Result<(Vec<u8>, &'static str), CoreError> {
    let rest = data_url.strip_prefix("data:").ok_or_else(|| {
        CoreError::Validation("frame must be a data: URL".to_string())
    })?;

    let (mediatype, encoded) = rest.split_once(";base64,").ok_or_else(|| {
        CoreError::Validation("frame data URL must be base64-encoded".to_string())
    })?;

    let ext = match mediatype {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        other => {
            return Err(CoreError::Validation(format!(
                "frame encoding '{other}' is not supported; use image/png or image/jpeg"
            )))
        }
    };

    let bytes = BASE64
        .decode(encoded)
        .map_err(|_| CoreError::Validation("frame data URL is not valid base64".to_string()))?;

    Ok((bytes, ext))
}
