use blake2::digest::consts::U64;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use std::fmt;

type KeyedBlake2b512 = Blake2bMac<U64>;

/// A 64-byte URL-component digest computed as keyed BLAKE2b-512.
///
/// The key is the per-installation pepper; without it the digest reveals
/// nothing about the component it was computed from.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UrlDigest(pub [u8; 64]);

impl UrlDigest {
    /// Compute a component digest using keyed BLAKE2b-512 over UTF-8 bytes.
    pub fn compute(key: &[u8; 32], value: &str) -> Self {
        let mut hasher =
            KeyedBlake2b512::new_from_slice(key).expect("valid 32-byte key for BLAKE2b");
        Mac::update(&mut hasher, value.as_bytes());
        let result = hasher.finalize();
        let mut out = [0u8; 64];
        out.copy_from_slice(&result.into_bytes());
        UrlDigest(out)
    }

    /// Hex-encode the full digest for storage inside hashed records.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for UrlDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UrlDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for UrlDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}
