//! Authenticated-encryption envelopes (AES-256-GCM).
//!
//! Two key-derivation modes share one cipher:
//! - **Keyed mode**: a process-wide [`EnvelopeKey`] derived once from a
//!   configured secret string. Used for annotation-at-rest encryption.
//! - **Password mode**: a per-call key derived with PBKDF2-HMAC-SHA256 from
//!   a caller-supplied password. Used by the protected-export subsystem.
//!
//! Envelopes are immutable once created. Decryption either fully succeeds
//! (tag verified) or fails atomically with [`CoreError::Decryption`]; no
//! partial plaintext is ever returned, and the error does not distinguish a
//! wrong key from corrupted data.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Cipher identifier stored in every envelope.
pub const ENVELOPE_ALG: &str = "aes-256-gcm";

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes (96 bits), fresh random per encryption.
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// PBKDF2 salt length in bytes (128 bits), fresh random per call.
pub const SALT_LEN: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for password mode.
pub const PBKDF2_ITERATIONS: u32 = 120_000;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A sealed authenticated-encryption envelope.
///
/// The serialized form is the stable on-disk contract:
/// `{"enc":"aes-256-gcm","iv":…,"tag":…,"data":…}` with base64 values, plus
/// `{"salt":…,"iter":…}` in password mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "enc")]
    pub alg: String,
    /// Base64-encoded 96-bit nonce.
    pub iv: String,
    /// Base64-encoded 128-bit GCM tag.
    pub tag: String,
    /// Base64-encoded ciphertext, equal in length to the plaintext.
    pub data: String,
    /// Base64-encoded PBKDF2 salt (password mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// PBKDF2 iteration count (password mode only).
    #[serde(rename = "iter", default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

/// Whether a stored JSON value carries the envelope marker.
///
/// Discriminates encrypted-at-rest payloads from plaintext annotation
/// documents.
pub fn is_envelope(value: &serde_json::Value) -> bool {
    value.get("enc").and_then(|v| v.as_str()) == Some(ENVELOPE_ALG)
}

// ---------------------------------------------------------------------------
// Keyed mode
// ---------------------------------------------------------------------------

/// A process-wide AES-256 key derived once from a configured secret.
#[derive(Clone)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must never reach logs.
        f.write_str("EnvelopeKey(..)")
    }
}

impl EnvelopeKey {
    /// Derive a key from a configured secret string.
    ///
    /// Accepts, in order of precedence: a 64-character hex string, a base64
    /// string, or raw UTF-8 bytes. The decoded bytes are truncated or
    /// zero-padded to exactly [`KEY_LEN`] bytes.
    pub fn from_secret(secret: &str) -> Self {
        let decoded = decode_secret(secret);
        let mut key = [0u8; KEY_LEN];
        let n = decoded.len().min(KEY_LEN);
        key[..n].copy_from_slice(&decoded[..n]);
        Self(key)
    }

    /// Construct from exactly 32 raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Encrypt `plaintext`, producing a keyed-mode envelope.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CoreError> {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);
        seal(&self.0, &iv, plaintext, None, None)
    }

    /// Decrypt a keyed-mode envelope.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CoreError> {
        open(&self.0, envelope)
    }
}

fn decode_secret(secret: &str) -> Vec<u8> {
    if secret.len() == 64 && secret.chars().all(|c| c.is_ascii_hexdigit()) {
        return decode_hex(secret);
    }
    if let Ok(bytes) = BASE64.decode(secret) {
        return bytes;
    }
    secret.as_bytes().to_vec()
}

fn decode_hex(s: &str) -> Vec<u8> {
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap_or(0);
            let lo = (pair[1] as char).to_digit(16).unwrap_or(0);
            (hi * 16 + lo) as u8
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Password mode
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under a caller-supplied password.
///
/// The key is PBKDF2-HMAC-SHA256(password, salt, [`PBKDF2_ITERATIONS`]) with
/// a fresh 128-bit salt; the envelope records both salt and iteration count.
pub fn encrypt_with_password(plaintext: &[u8], password: &str) -> Result<Envelope, CoreError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let key = derive_password_key(password, &salt, PBKDF2_ITERATIONS);
    seal(&key, &iv, plaintext, Some(&salt), Some(PBKDF2_ITERATIONS))
}

/// Decrypt a password-mode envelope.
///
/// Fails with [`CoreError::Validation`] before any cryptography when the
/// envelope carries no `salt`/`iter` (ill-formed, not a crypto failure), and
/// with [`CoreError::Decryption`] when the tag does not verify.
pub fn decrypt_with_password(envelope: &Envelope, password: &str) -> Result<Vec<u8>, CoreError> {
    let salt_b64 = envelope.salt.as_deref().ok_or_else(|| {
        CoreError::Validation("envelope is missing the password-mode salt".to_string())
    })?;
    let iterations = envelope.iterations.ok_or_else(|| {
        CoreError::Validation("envelope is missing the password-mode iteration count".to_string())
    })?;

    let salt = BASE64.decode(salt_b64).map_err(|_| CoreError::Decryption)?;
    let key = derive_password_key(password, &salt, iterations);
    open(&key, envelope)
}

fn derive_password_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

// ---------------------------------------------------------------------------
// Cipher core
// ---------------------------------------------------------------------------

fn seal(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
    salt: Option<&[u8]>,
    iterations: Option<u32>,
) -> Result<Envelope, CoreError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut ciphertext = cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| CoreError::Internal("AES-GCM encryption failed".to_string()))?;

    // aes-gcm appends the 16-byte tag; the envelope stores it separately.
    let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

    Ok(Envelope {
        alg: ENVELOPE_ALG.to_string(),
        iv: BASE64.encode(iv),
        tag: BASE64.encode(&tag),
        data: BASE64.encode(&ciphertext),
        salt: salt.map(|s| BASE64.encode(s)),
        iterations,
    })
}

fn open(key: &[u8; KEY_LEN], envelope: &Envelope) -> Result<Vec<u8>, CoreError> {
    if envelope.alg != ENVELOPE_ALG {
        return Err(CoreError::Decryption);
    }

    let iv = BASE64.decode(&envelope.iv).map_err(|_| CoreError::Decryption)?;
    let tag = BASE64.decode(&envelope.tag).map_err(|_| CoreError::Decryption)?;
    let data = BASE64.decode(&envelope.data).map_err(|_| CoreError::Decryption)?;

    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(CoreError::Decryption);
    }

    let mut combined = data;
    combined.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&iv), combined.as_slice())
        .map_err(|_| CoreError::Decryption)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_bit_b64(encoded: &str) -> String {
        let mut bytes = BASE64.decode(encoded).unwrap();
        bytes[0] ^= 0x01;
        BASE64.encode(&bytes)
    }

    // -- Keyed mode --------------------------------------------------------

    #[test]
    fn keyed_round_trip() {
        let key = EnvelopeKey::from_secret("correct horse battery staple");
        let envelope = key.encrypt(b"annotation payload").unwrap();
        assert_eq!(key.decrypt(&envelope).unwrap(), b"annotation payload");
    }

    #[test]
    fn keyed_envelope_shape() {
        let key = EnvelopeKey::from_secret("secret");
        let envelope = key.encrypt(b"abc").unwrap();
        assert_eq!(envelope.alg, ENVELOPE_ALG);
        assert_eq!(BASE64.decode(&envelope.iv).unwrap().len(), IV_LEN);
        assert_eq!(BASE64.decode(&envelope.tag).unwrap().len(), TAG_LEN);
        // Ciphertext is the same length as the plaintext.
        assert_eq!(BASE64.decode(&envelope.data).unwrap().len(), 3);
        assert!(envelope.salt.is_none());
        assert!(envelope.iterations.is_none());
    }

    #[test]
    fn keyed_iv_is_fresh_per_call() {
        let key = EnvelopeKey::from_secret("secret");
        let a = key.encrypt(b"same plaintext").unwrap();
        let b = key.encrypt(b"same plaintext").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn keyed_wrong_key_fails() {
        let key = EnvelopeKey::from_secret("alpha");
        let other = EnvelopeKey::from_secret("beta");
        let envelope = key.encrypt(b"payload").unwrap();
        assert!(matches!(
            other.decrypt(&envelope).unwrap_err(),
            CoreError::Decryption
        ));
    }

    #[test]
    fn secret_accepts_hex_base64_and_raw() {
        let hex = "00".repeat(32);
        let from_hex = EnvelopeKey::from_secret(&hex);
        let from_raw = EnvelopeKey::from_bytes([0u8; KEY_LEN]);
        let envelope = from_hex.encrypt(b"x").unwrap();
        assert_eq!(from_raw.decrypt(&envelope).unwrap(), b"x");

        let b64 = BASE64.encode([7u8; KEY_LEN]);
        let from_b64 = EnvelopeKey::from_secret(&b64);
        let envelope = from_b64.encrypt(b"y").unwrap();
        assert_eq!(
            EnvelopeKey::from_bytes([7u8; KEY_LEN]).decrypt(&envelope).unwrap(),
            b"y"
        );
    }

    #[test]
    fn short_secret_is_zero_padded_deterministically() {
        let a = EnvelopeKey::from_secret("short");
        let b = EnvelopeKey::from_secret("short");
        let envelope = a.encrypt(b"data").unwrap();
        assert_eq!(b.decrypt(&envelope).unwrap(), b"data");
    }

    // -- Password mode -----------------------------------------------------

    #[test]
    fn password_round_trip() {
        let envelope = encrypt_with_password(b"export bytes", "hunter2hunter2").unwrap();
        assert_eq!(envelope.iterations, Some(PBKDF2_ITERATIONS));
        assert_eq!(
            BASE64.decode(envelope.salt.as_deref().unwrap()).unwrap().len(),
            SALT_LEN
        );
        assert_eq!(
            decrypt_with_password(&envelope, "hunter2hunter2").unwrap(),
            b"export bytes"
        );
    }

    #[test]
    fn password_wrong_password_fails() {
        let envelope = encrypt_with_password(b"secret data", "password-one").unwrap();
        assert!(matches!(
            decrypt_with_password(&envelope, "password-two").unwrap_err(),
            CoreError::Decryption
        ));
    }

    #[test]
    fn password_salt_is_fresh_per_call() {
        let a = encrypt_with_password(b"p", "pw").unwrap();
        let b = encrypt_with_password(b"p", "pw").unwrap();
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn tampered_tag_fails() {
        let envelope = encrypt_with_password(b"integrity matters", "passphrase").unwrap();
        let mut bad = envelope.clone();
        bad.tag = flip_bit_b64(&bad.tag);
        assert!(matches!(
            decrypt_with_password(&bad, "passphrase").unwrap_err(),
            CoreError::Decryption
        ));
    }

    #[test]
    fn tampered_data_fails() {
        let envelope = encrypt_with_password(b"integrity matters", "passphrase").unwrap();
        let mut bad = envelope.clone();
        bad.data = flip_bit_b64(&bad.data);
        assert!(matches!(
            decrypt_with_password(&bad, "passphrase").unwrap_err(),
            CoreError::Decryption
        ));
    }

    #[test]
    fn missing_salt_rejected_before_crypto() {
        let mut envelope = encrypt_with_password(b"x", "passphrase").unwrap();
        envelope.salt = None;
        assert!(matches!(
            decrypt_with_password(&envelope, "passphrase").unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn missing_iterations_rejected_before_crypto() {
        let mut envelope = encrypt_with_password(b"x", "passphrase").unwrap();
        envelope.iterations = None;
        assert!(matches!(
            decrypt_with_password(&envelope, "passphrase").unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn keyed_decrypt_of_malformed_fields_fails() {
        let key = EnvelopeKey::from_secret("secret");
        let mut envelope = key.encrypt(b"x").unwrap();
        envelope.iv = "not base64!!".to_string();
        assert!(matches!(key.decrypt(&envelope).unwrap_err(), CoreError::Decryption));

        let mut envelope = key.encrypt(b"x").unwrap();
        envelope.alg = "aes-128-cbc".to_string();
        assert!(matches!(key.decrypt(&envelope).unwrap_err(), CoreError::Decryption));
    }

    // -- Serialization contract --------------------------------------------

    #[test]
    fn serialized_field_names_match_contract() {
        let envelope = encrypt_with_password(b"x", "passphrase").unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["enc"], ENVELOPE_ALG);
        assert!(value.get("iv").is_some());
        assert!(value.get("tag").is_some());
        assert!(value.get("data").is_some());
        assert!(value.get("salt").is_some());
        assert_eq!(value["iter"], PBKDF2_ITERATIONS);
        assert!(value.get("iterations").is_none());
    }

    #[test]
    fn keyed_serialization_omits_password_fields() {
        let key = EnvelopeKey::from_secret("secret");
        let value = serde_json::to_value(key.encrypt(b"x").unwrap()).unwrap();
        assert!(value.get("salt").is_none());
        assert!(value.get("iter").is_none());
    }

    #[test]
    fn is_envelope_discriminates() {
        let key = EnvelopeKey::from_secret("secret");
        let value = serde_json::to_value(key.encrypt(b"x").unwrap()).unwrap();
        assert!(is_envelope(&value));
        assert!(!is_envelope(&serde_json::json!({"version": "2.0", "layers": []})));
        assert!(!is_envelope(&serde_json::json!([])));
        assert!(!is_envelope(&serde_json::json!({"enc": "rot13"})));
    }
}
