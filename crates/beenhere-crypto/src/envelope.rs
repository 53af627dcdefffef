use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use beenhere_types::error::{Result, TrackerError};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Argon2id cost parameters. Deliberately expensive to slow brute force
/// of weak backup passwords: 64 MiB memory, 3 passes, single lane.
const KDF_TIME_COST: u32 = 3;
const KDF_MEMORY_COST_KIB: u32 = 65536;
const KDF_PARALLELISM: u32 = 1;

/// Portable encrypted backup container.
///
/// All binary fields are base64 so the envelope survives JSON transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEnvelope {
    pub v: u32,
    pub salt: String,
    pub nonce: String,
    pub data: String,
}

/// Encrypt `plaintext` under a password-derived key.
///
/// Fresh salt and nonce per call; the ciphertext carries the Poly1305 tag.
pub fn encrypt_with_password(password: &str, plaintext: &[u8]) -> Result<BackupEnvelope> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive_key(password, &salt)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_ref())
        .map_err(|e| TrackerError::KeyDerivation(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| TrackerError::Other(format!("ChaCha20-Poly1305 encrypt: {e}")))?;

    Ok(BackupEnvelope {
        v: ENVELOPE_VERSION,
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce_bytes),
        data: BASE64.encode(ciphertext),
    })
}

/// Decrypt an envelope produced by [`encrypt_with_password`].
///
/// A malformed envelope is rejected before any KDF work. Authentication
/// failure maps to [`TrackerError::DecryptionFailed`] — the caller cannot
/// distinguish a wrong password from a corrupted file, by construction.
pub fn decrypt_with_password(password: &str, envelope: &BackupEnvelope) -> Result<Vec<u8>> {
    if envelope.v != ENVELOPE_VERSION {
        return Err(TrackerError::InvalidEnvelope(format!(
            "unsupported version {}",
            envelope.v
        )));
    }
    let salt = decode_field("salt", &envelope.salt, SALT_LEN)?;
    let nonce_bytes = decode_field("nonce", &envelope.nonce, NONCE_LEN)?;
    let data = BASE64
        .decode(&envelope.data)
        .map_err(|e| TrackerError::InvalidEnvelope(format!("data: {e}")))?;
    if data.len() < 16 {
        return Err(TrackerError::InvalidEnvelope(
            "data shorter than authentication tag".into(),
        ));
    }

    let key = derive_key(password, &salt)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_ref())
        .map_err(|_| TrackerError::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), data.as_ref())
        .map_err(|_| TrackerError::DecryptionFailed)
}

fn decode_field(name: &str, value: &str, expected_len: usize) -> Result<Vec<u8>> {
    let bytes = BASE64
        .decode(value)
        .map_err(|e| TrackerError::InvalidEnvelope(format!("{name}: {e}")))?;
    if bytes.len() != expected_len {
        return Err(TrackerError::InvalidEnvelope(format!(
            "{name}: expected {expected_len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Derive a 32-byte key from a password using Argon2id.
fn derive_key(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let params =
        argon2::Params::new(KDF_MEMORY_COST_KIB, KDF_TIME_COST, KDF_PARALLELISM, Some(32))
            .map_err(|e| TrackerError::KeyDerivation(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, output.as_mut())
        .map_err(|e| TrackerError::KeyDerivation(format!("argon2 hash: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let envelope = encrypt_with_password("hunter2", b"payload bytes").unwrap();
        let plaintext = decrypt_with_password("hunter2", &envelope).unwrap();
        assert_eq!(plaintext, b"payload bytes");
    }

    #[test]
    fn wrong_password_fails() {
        let envelope = encrypt_with_password("correct", b"secret").unwrap();
        let result = decrypt_with_password("wrong", &envelope);
        assert!(matches!(result, Err(TrackerError::DecryptionFailed)));
    }

    #[test]
    fn tampered_data_fails() {
        let mut envelope = encrypt_with_password("pw", b"secret").unwrap();
        let mut raw = BASE64.decode(&envelope.data).unwrap();
        raw[0] ^= 0x01;
        envelope.data = BASE64.encode(raw);
        let result = decrypt_with_password("pw", &envelope);
        assert!(matches!(result, Err(TrackerError::DecryptionFailed)));
    }

    #[test]
    fn malformed_base64_rejected_before_decrypt() {
        let mut envelope = encrypt_with_password("pw", b"secret").unwrap();
        envelope.salt = "!!!".into();
        let result = decrypt_with_password("pw", &envelope);
        assert!(matches!(result, Err(TrackerError::InvalidEnvelope(_))));
    }

    #[test]
    fn wrong_salt_length_rejected() {
        let mut envelope = encrypt_with_password("pw", b"secret").unwrap();
        envelope.salt = BASE64.encode([0u8; 8]);
        let result = decrypt_with_password("pw", &envelope);
        assert!(matches!(result, Err(TrackerError::InvalidEnvelope(_))));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut envelope = encrypt_with_password("pw", b"secret").unwrap();
        envelope.v = 2;
        let result = decrypt_with_password("pw", &envelope);
        assert!(matches!(result, Err(TrackerError::InvalidEnvelope(_))));
    }

    #[test]
    fn fresh_salt_and_nonce_per_envelope() {
        let a = encrypt_with_password("pw", b"same").unwrap();
        let b = encrypt_with_password("pw", b"same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn envelope_serializes_to_flat_json() {
        let envelope = encrypt_with_password("pw", b"x").unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["v"], 1);
        assert!(json["salt"].is_string());
        assert!(json["nonce"].is_string());
        assert!(json["data"].is_string());
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let envelope = encrypt_with_password("pw", b"").unwrap();
        let plaintext = decrypt_with_password("pw", &envelope).unwrap();
        assert!(plaintext.is_empty());
    }
}
