use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beenhere_protocol::VisitRecordView;
use beenhere_types::VisitId;

use crate::normalize::build_address;

/// One URL's component keys under a single scheme: either all plaintext
/// normalized strings or all pepper-digest hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub host: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
    /// Per-parameter keys, parallel to the normalized query entries.
    pub params: Vec<String>,
}

impl KeySet {
    pub fn visit_id(&self) -> VisitId {
        VisitId::compose(&self.host, &self.path, &self.query, &self.fragment)
    }
}

/// A record's identity scheme. Once created, a record never silently
/// changes scheme — the global encryption setting only affects new
/// records, so both variants coexist in one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitIdentity {
    Plain(KeySet),
    Hashed(KeySet),
}

impl VisitIdentity {
    pub fn new(hashed: bool, keys: KeySet) -> Self {
        if hashed {
            VisitIdentity::Hashed(keys)
        } else {
            VisitIdentity::Plain(keys)
        }
    }

    pub fn keys(&self) -> &KeySet {
        match self {
            VisitIdentity::Plain(keys) | VisitIdentity::Hashed(keys) => keys,
        }
    }

    pub fn is_hashed(&self) -> bool {
        matches!(self, VisitIdentity::Hashed(_))
    }

    /// Identity key, recomputed from this variant's own key set.
    pub fn id(&self) -> VisitId {
        self.keys().visit_id()
    }
}

/// A persisted visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VisitRecordWire", into = "VisitRecordWire")]
pub struct VisitRecord {
    pub identity: VisitIdentity,
    pub last_visited: DateTime<Utc>,
    pub visit_count: u32,
    pub download: bool,
}

impl VisitRecord {
    pub fn new(identity: VisitIdentity, now: DateTime<Utc>, download: bool) -> Self {
        Self {
            identity,
            last_visited: now,
            visit_count: 1,
            download,
        }
    }

    pub fn id(&self) -> VisitId {
        self.identity.id()
    }

    /// Apply one more encounter of the same identity.
    pub fn register_visit(&mut self, now: DateTime<Utc>, download: bool) {
        self.visit_count = self.visit_count.saturating_add(1);
        self.last_visited = now;
        self.download |= download;
    }

    /// Displayable address, or `None` for hashed records whose components
    /// are irreversible digests.
    pub fn address(&self) -> Option<String> {
        if self.identity.is_hashed() {
            return None;
        }
        let keys = self.identity.keys();
        Some(build_address(
            &keys.host,
            &keys.path,
            &keys.query,
            &keys.fragment,
        ))
    }

    pub fn to_view(&self) -> VisitRecordView {
        let keys = self.identity.keys();
        let hashed = self.identity.is_hashed();
        if hashed {
            VisitRecordView {
                id: self.id().as_str().to_string(),
                address: WITHHELD.into(),
                host: WITHHELD.into(),
                path: WITHHELD.into(),
                query: String::new(),
                fragment: String::new(),
                visit_count: self.visit_count,
                last_visited: self.last_visited,
                hashed,
                download: self.download,
            }
        } else {
            VisitRecordView {
                id: self.id().as_str().to_string(),
                address: build_address(&keys.host, &keys.path, &keys.query, &keys.fragment),
                host: keys.host.clone(),
                path: keys.path.clone(),
                query: keys.query.clone(),
                fragment: keys.fragment.clone(),
                visit_count: self.visit_count,
                last_visited: self.last_visited,
                hashed,
                download: self.download,
            }
        }
    }
}

/// Placeholder the UI shows instead of hashed components.
const WITHHELD: &str = "???";

/// Current time truncated to millisecond precision — the resolution
/// `lastVisited` is stored and transported at. Creating records at
/// sub-millisecond precision would make a record compare unequal to its
/// own stored form.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Flat portable shape for storage blobs and backup payloads. The
/// component fields hold plaintext or digests depending on `hashed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitRecordWire {
    id: String,
    host: String,
    path: String,
    query: String,
    fragment: String,
    #[serde(default)]
    query_params: Vec<String>,
    hashed: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_visited: DateTime<Utc>,
    visit_count: u32,
    #[serde(default)]
    download: bool,
}

impl From<VisitRecord> for VisitRecordWire {
    fn from(record: VisitRecord) -> Self {
        let id = record.id().as_str().to_string();
        let hashed = record.identity.is_hashed();
        let keys = match record.identity {
            VisitIdentity::Plain(keys) | VisitIdentity::Hashed(keys) => keys,
        };
        VisitRecordWire {
            id,
            host: keys.host,
            path: keys.path,
            query: keys.query,
            fragment: keys.fragment,
            query_params: keys.params,
            hashed,
            last_visited: record.last_visited,
            visit_count: record.visit_count,
            download: record.download,
        }
    }
}

impl TryFrom<VisitRecordWire> for VisitRecord {
    type Error = String;

    fn try_from(wire: VisitRecordWire) -> std::result::Result<Self, Self::Error> {
        if wire.visit_count == 0 {
            return Err(format!("visit record '{}' has zero visit count", wire.id));
        }
        let keys = KeySet {
            host: wire.host,
            path: wire.path,
            query: wire.query,
            fragment: wire.fragment,
            params: wire.query_params,
        };
        let identity = VisitIdentity::new(wire.hashed, keys);
        // The stored id is advisory; identity is always recomputed from
        // the record's own key set so the scheme stays self-describing.
        Ok(VisitRecord {
            identity,
            last_visited: wire.last_visited,
            visit_count: wire.visit_count,
            download: wire.download,
        })
    }
}
