use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// Composite visit identity: `host|path|query|fragment`.
///
/// The components are either all plaintext or all pepper digests, depending
/// on the scheme the record was stored under; the composite itself never
/// mixes schemes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(String);

impl VisitId {
    pub fn compose(host: &str, path: &str, query: &str, fragment: &str) -> Self {
        VisitId(format!("{host}|{path}|{query}|{fragment}"))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        VisitId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key path: `visits/<2-hex shard>/<64-hex digest>`.
    ///
    /// Identity strings contain separator characters and, for plaintext
    /// records, arbitrary URL text, so the backend key is an unkeyed
    /// BLAKE2b-256 of the identity instead of the identity itself.
    pub fn storage_key(&self) -> String {
        let mut hasher = Blake2b256::new();
        Digest::update(&mut hasher, self.0.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("visits/{}/{}", &digest[..2], digest)
    }
}

impl fmt::Debug for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VisitId({})", truncated(&self.0))
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn truncated(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
