use beenhere_crypto::Pepper;
use beenhere_types::VisitId;

use crate::normalize::{normalize_url, UrlParts};
use crate::record::KeySet;

/// Ephemeral dual representation of one URL, built fresh per lookup.
///
/// Both key sets and both identity keys are always retained so lookups
/// can match records stored under either scheme; `stored_hashed` only
/// decides which scheme a *new* record created from this fingerprint
/// would use.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub parts: UrlParts,
    pub plain: KeySet,
    pub hash: KeySet,
    pub stored_hashed: bool,
}

impl Fingerprint {
    pub fn id_plain(&self) -> VisitId {
        self.plain.visit_id()
    }

    pub fn id_hash(&self) -> VisitId {
        self.hash.visit_id()
    }

    /// Candidate identity keys for full-match lookup, hashed scheme first.
    pub fn candidate_ids(&self) -> [VisitId; 2] {
        [self.id_hash(), self.id_plain()]
    }

    /// Candidate host keys for partial-match lookup, hashed scheme first.
    pub fn candidate_hosts(&self) -> [&str; 2] {
        [&self.hash.host, &self.plain.host]
    }

    /// Key set in the given record scheme.
    pub fn keys_for(&self, hashed: bool) -> &KeySet {
        if hashed {
            &self.hash
        } else {
            &self.plain
        }
    }

    /// Key set a new record would be stored under.
    pub fn active_keys(&self) -> &KeySet {
        self.keys_for(self.stored_hashed)
    }

    /// Identity a new record would be stored under.
    pub fn active_id(&self) -> VisitId {
        self.active_keys().visit_id()
    }
}

/// Build a fingerprint for a raw URL, or `None` if it is untrackable.
///
/// The pepper is only read here, never mutated; concurrent lookups share
/// one cached pepper.
pub fn build_fingerprint(raw_url: &str, pepper: &Pepper, stored_hashed: bool) -> Option<Fingerprint> {
    let parts = normalize_url(raw_url)?;

    let plain = KeySet {
        host: parts.host.clone(),
        path: parts.path.clone(),
        query: parts.query.clone(),
        fragment: parts.fragment.clone(),
        params: parts.query_entries.clone(),
    };
    let hash = KeySet {
        host: pepper.digest_hex(&parts.host),
        path: pepper.digest_hex(&parts.path),
        query: pepper.digest_hex(&parts.query),
        fragment: pepper.digest_hex(&parts.fragment),
        params: parts
            .query_entries
            .iter()
            .map(|entry| pepper.digest_hex(entry))
            .collect(),
    };

    Some(Fingerprint {
        parts,
        plain,
        hash,
        stored_hashed,
    })
}
