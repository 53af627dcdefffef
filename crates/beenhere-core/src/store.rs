use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use beenhere_types::error::Result;
use beenhere_types::VisitId;

use crate::record::VisitRecord;
use crate::storage::{is_capability_error, MemoryBackend, StoreBackend};

const VISITS_PREFIX: &str = "visits/";
const META_PREFIX: &str = "meta/";

/// A scalar setting persisted alongside the visit records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: String,
    pub value: serde_json::Value,
}

/// Typed record/meta operations over a [`StoreBackend`], with graceful
/// degradation: the first capability error (read-only media, revoked
/// permission) flips a sticky latch and all further operations run
/// against an in-memory mirror for the remainder of the process.
pub struct VisitStore {
    primary: Box<dyn StoreBackend>,
    fallback: MemoryBackend,
    degraded: AtomicBool,
}

impl VisitStore {
    pub fn new(primary: Box<dyn StoreBackend>) -> Self {
        Self {
            primary,
            fallback: MemoryBackend::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the store has fallen back to memory-only operation.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn run<T>(&self, op: impl Fn(&dyn StoreBackend) -> Result<T>) -> Result<T> {
        if !self.is_degraded() {
            match op(self.primary.as_ref()) {
                Err(e) if is_capability_error(&e) => {
                    warn!("persistent store rejected operation ({e}); switching to in-memory store");
                    self.degrade();
                }
                other => return other,
            }
        }
        op(&self.fallback)
    }

    /// Best-effort copy of whatever is still readable from the primary
    /// backend into the fallback, then latch. Reads often keep working
    /// after writes start failing, so this preserves match behavior for
    /// the rest of the process.
    fn degrade(&self) {
        let mut copied = 0usize;
        if let Ok(keys) = self.primary.list("") {
            for key in keys {
                if let Ok(Some(data)) = self.primary.get(&key) {
                    if self.fallback.put(&key, &data).is_ok() {
                        copied += 1;
                    }
                }
            }
        }
        debug!("mirrored {copied} entries into the in-memory store");
        self.degraded.store(true, Ordering::Release);
    }

    // ── visit records ──────────────────────────────────────────────

    pub fn get_record(&self, id: &VisitId) -> Result<Option<VisitRecord>> {
        let key = id.storage_key();
        self.run(|backend| {
            let Some(data) = backend.get(&key)? else {
                return Ok(None);
            };
            Ok(Some(rmp_serde::from_slice(&data)?))
        })
    }

    pub fn put_record(&self, record: &VisitRecord) -> Result<()> {
        let key = record.id().storage_key();
        let data = rmp_serde::to_vec(record)?;
        self.run(|backend| backend.put(&key, &data))
    }

    pub fn put_records(&self, records: &[VisitRecord]) -> Result<()> {
        for record in records {
            self.put_record(record)?;
        }
        Ok(())
    }

    pub fn delete_record(&self, id: &VisitId) -> Result<()> {
        let key = id.storage_key();
        self.run(|backend| backend.delete(&key))
    }

    /// Every stored record, in unspecified order.
    pub fn all_records(&self) -> Result<Vec<VisitRecord>> {
        self.run(|backend| {
            let mut records = Vec::new();
            for key in backend.list(VISITS_PREFIX)? {
                if let Some(data) = backend.get(&key)? {
                    records.push(rmp_serde::from_slice(&data)?);
                }
            }
            Ok(records)
        })
    }

    /// Records whose own host key (in their own scheme) equals `host_key`.
    pub fn records_by_host(&self, host_key: &str) -> Result<Vec<VisitRecord>> {
        let mut records = self.all_records()?;
        records.retain(|record| record.identity.keys().host == host_key);
        Ok(records)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.run(|backend| backend.clear())
    }

    // ── meta entries ───────────────────────────────────────────────

    pub fn meta_get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let storage_key = format!("{META_PREFIX}{key}");
        self.run(|backend| {
            let Some(data) = backend.get(&storage_key)? else {
                return Ok(None);
            };
            Ok(Some(rmp_serde::from_slice(&data)?))
        })
    }

    pub fn meta_set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let storage_key = format!("{META_PREFIX}{key}");
        let data = rmp_serde::to_vec(value)?;
        self.run(|backend| backend.put(&storage_key, &data))
    }

    /// All meta entries, for backup payloads.
    pub fn meta_all(&self) -> Result<Vec<MetaEntry>> {
        self.run(|backend| {
            let mut entries = Vec::new();
            for storage_key in backend.list(META_PREFIX)? {
                if let Some(data) = backend.get(&storage_key)? {
                    entries.push(MetaEntry {
                        key: storage_key[META_PREFIX.len()..].to_string(),
                        value: rmp_serde::from_slice(&data)?,
                    });
                }
            }
            Ok(entries)
        })
    }
}
