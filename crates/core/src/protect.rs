//! Protected-export wrapper format and password policy.
//!
//! A protected file wraps the base64-encoded original in a password-mode
//! [`Envelope`] with integrity metadata. The serialized wrapper layout is a
//! stable on-disk contract:
//! `{"meta":{"original_ext":…,"content_hash":…,"created_at":…},"payload":{…}}`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::envelope::{decrypt_with_password, encrypt_with_password, Envelope};
use crate::error::CoreError;
use crate::hashing::sha256_hex;

/// Minimum accepted password length, enforced before any cryptography.
pub const MIN_PASSWORD_LEN: usize = 8;

/// File suffix appended to protected wrappers.
pub const PROTECTED_SUFFIX: &str = ".protected.json";

/// Integrity metadata carried alongside the encrypted payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtectedMeta {
    /// Extension of the original file, without the dot.
    pub original_ext: String,
    /// SHA-256 hex digest of the original bytes.
    pub content_hash: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// The on-disk protected wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtectedFile {
    pub meta: ProtectedMeta,
    pub payload: Envelope,
}

/// Validate a protect/unprotect password before any crypto work.
pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

impl ProtectedFile {
    /// Seal `original` under `password`.
    ///
    /// The original bytes are base64-encoded, then encrypted in password
    /// mode; the wrapper records the original extension, a SHA-256 content
    /// hash, and the creation time.
    pub fn seal(original: &[u8], original_ext: &str, password: &str) -> Result<Self, CoreError> {
        validate_password(password)?;

        let encoded = BASE64.encode(original);
        let payload = encrypt_with_password(encoded.as_bytes(), password)?;

        Ok(Self {
            meta: ProtectedMeta {
                original_ext: original_ext.trim_start_matches('.').to_string(),
                content_hash: sha256_hex(original),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            payload,
        })
    }

    /// Recover the original bytes using `password`.
    ///
    /// A wrong password surfaces as [`CoreError::Decryption`], never as
    /// silently corrupted output.
    pub fn open(&self, password: &str) -> Result<Vec<u8>, CoreError> {
        validate_password(password)?;

        let encoded = decrypt_with_password(&self.payload, password)?;
        let encoded = String::from_utf8(encoded).map_err(|_| CoreError::Decryption)?;
        BASE64.decode(&encoded).map_err(|_| CoreError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "a-long-enough-password";

    #[test]
    fn seal_open_round_trip() {
        let original = b"\x89PNG\r\n\x1a\n binary image bytes";
        let sealed = ProtectedFile::seal(original, "png", PASSWORD).unwrap();
        assert_eq!(sealed.open(PASSWORD).unwrap(), original);
    }

    #[test]
    fn meta_records_extension_and_hash() {
        let original = b"pdf bytes";
        let sealed = ProtectedFile::seal(original, ".pdf", PASSWORD).unwrap();
        assert_eq!(sealed.meta.original_ext, "pdf");
        assert_eq!(sealed.meta.content_hash, sha256_hex(original));
        assert!(!sealed.meta.created_at.is_empty());
    }

    #[test]
    fn wrong_password_is_a_decryption_failure() {
        let sealed = ProtectedFile::seal(b"secret", "png", PASSWORD).unwrap();
        assert!(matches!(
            sealed.open("different-password").unwrap_err(),
            CoreError::Decryption
        ));
    }

    #[test]
    fn short_password_rejected_before_crypto() {
        assert!(matches!(
            ProtectedFile::seal(b"x", "png", "short").unwrap_err(),
            CoreError::Validation(_)
        ));
        let sealed = ProtectedFile::seal(b"x", "png", PASSWORD).unwrap();
        assert!(matches!(
            sealed.open("short").unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn password_at_minimum_length_accepted() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn wrapper_serialization_layout() {
        let sealed = ProtectedFile::seal(b"bytes", "tif", PASSWORD).unwrap();
        let value = serde_json::to_value(&sealed).unwrap();
        assert!(value["meta"]["original_ext"].is_string());
        assert!(value["meta"]["content_hash"].is_string());
        assert!(value["meta"]["created_at"].is_string());
        assert_eq!(value["payload"]["enc"], "aes-256-gcm");
        assert!(value["payload"]["salt"].is_string());
        assert!(value["payload"]["iter"].is_u64());

        let parsed: ProtectedFile = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.open(PASSWORD).unwrap(), b"bytes");
    }
}
