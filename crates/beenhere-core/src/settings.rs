use std::collections::BTreeSet;
use std::sync::Mutex;

use beenhere_types::error::{Result, TrackerError};

use crate::store::VisitStore;

/// Reserved meta keys.
pub const META_PEPPER: &str = "pepper";
pub const META_ENCRYPTION_ENABLED: &str = "encryptionEnabled";
pub const META_MATCH_EXCEPTIONS: &str = "matchExceptions";
pub const META_PARTIAL_EXCEPTIONS: &str = "partialExceptions";

/// Hostnames excluded from full-match and partial-match detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionLists {
    match_hosts: BTreeSet<String>,
    partial_hosts: BTreeSet<String>,
}

impl ExceptionLists {
    pub fn new(match_hosts: impl IntoIterator<Item = String>, partial_hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            match_hosts: normalize_hosts(match_hosts),
            partial_hosts: normalize_hosts(partial_hosts),
        }
    }

    pub fn is_match_excepted(&self, host: &str) -> bool {
        self.match_hosts.contains(host)
    }

    pub fn is_partial_excepted(&self, host: &str) -> bool {
        self.partial_hosts.contains(host)
    }

    pub fn match_hosts(&self) -> Vec<String> {
        self.match_hosts.iter().cloned().collect()
    }

    pub fn partial_hosts(&self) -> Vec<String> {
        self.partial_hosts.iter().cloned().collect()
    }
}

fn normalize_hosts(hosts: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    hosts
        .into_iter()
        .map(|host| host.trim().to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}

/// Bundled defaults, applied when nothing is persisted yet.
#[derive(Debug, Clone, Default)]
pub struct ExceptionDefaults {
    pub match_hosts: Vec<String>,
    pub partial_hosts: Vec<String>,
}

/// Lazily-cached settings derived from the meta table. Owned by the
/// tracker context; invalidated wholesale after a restore replaces the
/// underlying data.
#[derive(Default)]
pub struct SettingsCache {
    encryption: Mutex<Option<bool>>,
    exceptions: Mutex<Option<ExceptionLists>>,
}

impl SettingsCache {
    pub fn encryption_enabled(&self, store: &VisitStore) -> Result<bool> {
        let mut cache = lock(&self.encryption);
        if let Some(enabled) = *cache {
            return Ok(enabled);
        }
        let enabled = match store.meta_get(META_ENCRYPTION_ENABLED)? {
            Some(serde_json::Value::Bool(enabled)) => enabled,
            _ => false,
        };
        *cache = Some(enabled);
        Ok(enabled)
    }

    pub fn set_encryption_enabled(&self, store: &VisitStore, enabled: bool) -> Result<()> {
        store.meta_set(META_ENCRYPTION_ENABLED, &serde_json::Value::Bool(enabled))?;
        *lock(&self.encryption) = Some(enabled);
        Ok(())
    }

    /// Current exception lists; falls back to the bundled defaults for
    /// any list with nothing persisted.
    pub fn exception_lists(
        &self,
        store: &VisitStore,
        defaults: &ExceptionDefaults,
    ) -> Result<ExceptionLists> {
        let mut cache = lock(&self.exceptions);
        if let Some(lists) = cache.as_ref() {
            return Ok(lists.clone());
        }
        let match_hosts = load_host_list(store, META_MATCH_EXCEPTIONS)?
            .unwrap_or_else(|| defaults.match_hosts.clone());
        let partial_hosts = load_host_list(store, META_PARTIAL_EXCEPTIONS)?
            .unwrap_or_else(|| defaults.partial_hosts.clone());
        let lists = ExceptionLists::new(match_hosts, partial_hosts);
        *cache = Some(lists.clone());
        Ok(lists)
    }

    pub fn set_match_exceptions(
        &self,
        store: &VisitStore,
        defaults: &ExceptionDefaults,
        items: Vec<String>,
    ) -> Result<ExceptionLists> {
        let current = self.exception_lists(store, defaults)?;
        let updated = ExceptionLists::new(items, current.partial_hosts());
        store_host_list(store, META_MATCH_EXCEPTIONS, &updated.match_hosts())?;
        *lock(&self.exceptions) = Some(updated.clone());
        Ok(updated)
    }

    pub fn set_partial_exceptions(
        &self,
        store: &VisitStore,
        defaults: &ExceptionDefaults,
        items: Vec<String>,
    ) -> Result<ExceptionLists> {
        let current = self.exception_lists(store, defaults)?;
        let updated = ExceptionLists::new(current.match_hosts(), items);
        store_host_list(store, META_PARTIAL_EXCEPTIONS, &updated.partial_hosts())?;
        *lock(&self.exceptions) = Some(updated.clone());
        Ok(updated)
    }

    /// Drop every cached value. Called after restore, when the data the
    /// caches were derived from may have changed wholesale.
    pub fn invalidate(&self) {
        *lock(&self.encryption) = None;
        *lock(&self.exceptions) = None;
    }
}

fn load_host_list(store: &VisitStore, key: &str) -> Result<Option<Vec<String>>> {
    match store.meta_get(key)? {
        None => Ok(None),
        Some(serde_json::Value::Array(values)) => {
            let mut hosts = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    serde_json::Value::String(host) => hosts.push(host),
                    _ => return Err(TrackerError::InvalidMeta(key.to_string())),
                }
            }
            if hosts.is_empty() {
                Ok(None)
            } else {
                Ok(Some(hosts))
            }
        }
        Some(_) => Err(TrackerError::InvalidMeta(key.to_string())),
    }
}

fn store_host_list(store: &VisitStore, key: &str, hosts: &[String]) -> Result<()> {
    let value = serde_json::Value::Array(
        hosts
            .iter()
            .map(|host| serde_json::Value::String(host.clone()))
            .collect(),
    );
    store.meta_set(key, &value)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
