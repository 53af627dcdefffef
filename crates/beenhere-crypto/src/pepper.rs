use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use beenhere_types::error::{Result, TrackerError};
use beenhere_types::UrlDigest;

/// The per-installation digest secret.
///
/// Never leaves the local store except inside an encrypted backup;
/// zeroized on drop so key material does not linger in memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pepper {
    key: [u8; 32],
}

impl Pepper {
    /// Generate a fresh pepper from OS entropy.
    ///
    /// Fails loudly if the secure random source is unavailable — a weak
    /// fallback seed would silently break the unlinkability of every
    /// digest derived from it.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| TrackerError::Rng(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Decode a pepper from its persisted base64 form.
    pub fn from_base64(value: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(value)
            .map_err(|e| TrackerError::InvalidMeta(format!("pepper: {e}")))?;
        if bytes.len() != 32 {
            return Err(TrackerError::InvalidMeta(format!(
                "pepper: expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    /// Encode for persistence in the meta table.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.key)
    }

    /// Keyed digest of one normalized URL component.
    pub fn digest(&self, value: &str) -> UrlDigest {
        UrlDigest::compute(&self.key, value)
    }

    /// Hex form of [`digest`](Self::digest), as stored in hashed records.
    pub fn digest_hex(&self, value: &str) -> String {
        self.digest(value).to_hex()
    }
}
