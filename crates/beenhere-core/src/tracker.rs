use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use beenhere_crypto::{BackupEnvelope, Pepper};
use beenhere_protocol::{LinkQuery, VisitedLink};
use beenhere_types::error::Result;
use beenhere_types::{MatchState, VisitId};

use crate::backup::{self, RestoreOptions};
use crate::classify::{self, ClassifyOptions};
use crate::export::{self, ExportOptions};
use crate::fingerprint::{build_fingerprint, Fingerprint};
use crate::import::{self, ImportOutcome, ImportPreview};
use crate::record::{VisitIdentity, VisitRecord};
use crate::session::TabSessions;
use crate::settings::{ExceptionDefaults, SettingsCache, META_PEPPER};
use crate::storage::{LocalBackend, MemoryBackend, StoreBackend};
use crate::store::VisitStore;

const PARTIAL_MATCH_LIMIT: usize = 5;
const STATS_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Prefix for generated export/backup filenames.
    pub filename_prefix: String,
    /// Bundled default exception lists, used until the user edits them.
    pub default_match_exceptions: Vec<String>,
    pub default_partial_exceptions: Vec<String>,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            filename_prefix: "beenhere".to_string(),
            default_match_exceptions: Vec::new(),
            default_partial_exceptions: Vec::new(),
        }
    }
}

/// Aggregate answer for "have I seen this URL".
#[derive(Debug, Clone)]
pub struct VisitSummary {
    pub visit_count: u32,
    pub last_visited: Option<DateTime<Utc>>,
    pub match_state: MatchState,
}

impl VisitSummary {
    fn untracked() -> Self {
        Self {
            visit_count: 0,
            last_visited: None,
            match_state: MatchState::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_entries: u64,
    pub total_visits: u64,
    /// Most recently visited records, newest first.
    pub recent: Vec<VisitRecord>,
}

/// A built export artifact plus its suggested filename.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content: String,
    pub exported: usize,
}

/// An encrypted backup plus its suggested filename.
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub filename: String,
    pub envelope: BackupEnvelope,
}

/// The tracker context: owns the store, the cached pepper, cached
/// settings, and per-tab transient state.
///
/// All state lives here rather than in globals so embedders and tests
/// can run several independent instances. Store mutation is gated by an
/// `RwLock`: ordinary operations share the read side, restore takes the
/// write side so it never interleaves with an upsert.
pub struct Tracker {
    store: VisitStore,
    options: TrackerOptions,
    defaults: ExceptionDefaults,
    pepper: Mutex<Option<Pepper>>,
    settings: SettingsCache,
    sessions: TabSessions,
    gate: RwLock<()>,
}

impl Tracker {
    pub fn new(backend: Box<dyn StoreBackend>, options: TrackerOptions) -> Self {
        let defaults = ExceptionDefaults {
            match_hosts: options.default_match_exceptions.clone(),
            partial_hosts: options.default_partial_exceptions.clone(),
        };
        Self {
            store: VisitStore::new(backend),
            options,
            defaults,
            pepper: Mutex::new(None),
            settings: SettingsCache::default(),
            sessions: TabSessions::new(),
            gate: RwLock::new(()),
        }
    }

    /// Open a tracker backed by a local directory.
    pub fn open(root: &Path, options: TrackerOptions) -> Result<Self> {
        Ok(Self::new(Box::new(LocalBackend::new(root)?), options))
    }

    /// Tracker with no persistence at all.
    pub fn in_memory(options: TrackerOptions) -> Self {
        Self::new(Box::new(MemoryBackend::new()), options)
    }

    pub fn store(&self) -> &VisitStore {
        &self.store
    }

    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The installation pepper, loading or generating it on first use.
    ///
    /// The cell's mutex doubles as the singleton-initialization guard:
    /// concurrent first callers block on one load/generate instead of
    /// racing to create distinct peppers.
    fn pepper(&self) -> Result<Pepper> {
        let mut cell = lock(&self.pepper);
        if let Some(pepper) = cell.as_ref() {
            return Ok(pepper.clone());
        }
        let pepper = match self.store.meta_get(META_PEPPER)? {
            Some(serde_json::Value::String(encoded)) => Pepper::from_base64(&encoded)?,
            _ => {
                let fresh = Pepper::generate()?;
                self.store
                    .meta_set(META_PEPPER, &serde_json::Value::String(fresh.to_base64()))?;
                info!("generated new installation pepper");
                fresh
            }
        };
        *cell = Some(pepper.clone());
        Ok(pepper)
    }

    /// Fingerprint a raw URL, or `None` if it is untrackable.
    pub fn fingerprint(&self, url: &str) -> Result<Option<Fingerprint>> {
        let pepper = self.pepper()?;
        let stored_hashed = self.settings.encryption_enabled(&self.store)?;
        Ok(build_fingerprint(url, &pepper, stored_hashed))
    }

    fn exceptions(&self) -> Result<crate::settings::ExceptionLists> {
        self.settings.exception_lists(&self.store, &self.defaults)
    }

    /// Create-or-update the record for this fingerprint's identity.
    ///
    /// An existing record keeps its own scheme; only brand-new records
    /// follow the current encryption setting.
    fn upsert(&self, fingerprint: &Fingerprint, download: bool) -> Result<VisitRecord> {
        let existing = classify::find_full(&self.store, fingerprint)?;
        let now = crate::record::now_millis();
        let record = match existing {
            Some(mut record) => {
                let hashed = record.identity.is_hashed();
                record.identity = VisitIdentity::new(hashed, fingerprint.keys_for(hashed).clone());
                record.register_visit(now, download);
                record
            }
            None => VisitRecord::new(
                VisitIdentity::new(fingerprint.stored_hashed, fingerprint.active_keys().clone()),
                now,
                download,
            ),
        };
        self.store.put_record(&record)?;
        Ok(record)
    }

    /// Handle a committed navigation in a tab: classify against the
    /// store, update the tab's transient state, and upsert the visit.
    /// Returns the state the UI should show for this load.
    pub fn navigation(&self, tab_id: u64, url: &str) -> Result<MatchState> {
        let _guard = self.read_gate();
        let Some(fingerprint) = self.fingerprint(url)? else {
            return Ok(MatchState::None);
        };
        let exceptions = self.exceptions()?;
        let classification = classify::classify(
            &self.store,
            &fingerprint,
            &exceptions,
            ClassifyOptions::default(),
        )?;

        let active_id = fingerprint.active_id();
        // Reload of the page this tab already saved: report the prior
        // outcome without counting another visit.
        if self.sessions.last_saved_id(tab_id).as_ref() == Some(&active_id) {
            let mut state = classification.state;
            if self.sessions.pending_first_visit(tab_id) {
                state = MatchState::None;
            }
            self.sessions.set_last_state(tab_id, state);
            return Ok(state);
        }

        let state = classification.state;
        self.sessions.begin_visit(
            tab_id,
            state,
            classification.record.as_ref().map(|r| r.last_visited),
        );
        self.upsert(&fingerprint, false)?;
        self.sessions.set_last_saved_id(tab_id, active_id);
        Ok(state)
    }

    /// Record a visit without tab bookkeeping (imports, tests, embedders
    /// with no tab concept). Returns `None` for untrackable URLs.
    pub fn record_visit(&self, url: &str) -> Result<Option<VisitRecord>> {
        let _guard = self.read_gate();
        let Some(fingerprint) = self.fingerprint(url)? else {
            return Ok(None);
        };
        Ok(Some(self.upsert(&fingerprint, false)?))
    }

    /// Record a completed download of this URL.
    pub fn record_download(&self, url: &str) -> Result<Option<VisitRecord>> {
        let _guard = self.read_gate();
        let Some(fingerprint) = self.fingerprint(url)? else {
            return Ok(None);
        };
        Ok(Some(self.upsert(&fingerprint, true)?))
    }

    /// Visited-state check for a batch of links.
    pub fn check_links(
        &self,
        links: &[LinkQuery],
        options: ClassifyOptions,
    ) -> Result<Vec<VisitedLink>> {
        let _guard = self.read_gate();
        let exceptions = self.exceptions()?;
        let mut visited = Vec::new();
        for link in links {
            let Some(fingerprint) = self.fingerprint(&link.href)? else {
                continue;
            };
            let classification =
                classify::classify(&self.store, &fingerprint, &exceptions, options)?;
            if classification.state.is_match() {
                visited.push(VisitedLink {
                    token: link.token.clone(),
                    state: classification.state,
                });
            }
        }
        Ok(visited)
    }

    /// Visit count, last-visit time, and match state for one URL. With a
    /// tab id, the tab's remembered state and pre-navigation visit time
    /// take precedence, so the answer describes the visit *before* the
    /// one in progress.
    pub fn visit_summary(&self, url: &str, tab_id: Option<u64>) -> Result<VisitSummary> {
        let _guard = self.read_gate();
        let Some(fingerprint) = self.fingerprint(url)? else {
            return Ok(VisitSummary::untracked());
        };
        let exceptions = self.exceptions()?;
        let classification = classify::classify(
            &self.store,
            &fingerprint,
            &exceptions,
            ClassifyOptions::default(),
        )?;

        let mut summary = VisitSummary {
            visit_count: classification
                .record
                .as_ref()
                .map(|r| r.visit_count)
                .unwrap_or(0),
            last_visited: classification.record.as_ref().map(|r| r.last_visited),
            match_state: classification.state,
        };
        if let Some(tab_id) = tab_id {
            if let Some(state) = self.sessions.last_state(tab_id) {
                summary.match_state = state;
            }
            if let Some(previous) = self.sessions.previous_visit(tab_id) {
                summary.last_visited = Some(previous);
            }
        }
        Ok(summary)
    }

    /// Top partial matches for a URL, newest first.
    pub fn partial_matches(&self, url: &str) -> Result<Vec<VisitRecord>> {
        let _guard = self.read_gate();
        let Some(fingerprint) = self.fingerprint(url)? else {
            return Ok(Vec::new());
        };
        classify::find_partial_matches(&self.store, &fingerprint, PARTIAL_MATCH_LIMIT)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let _guard = self.read_gate();
        let mut records = self.store.all_records()?;
        let total_entries = records.len() as u64;
        let total_visits = records.iter().map(|r| u64::from(r.visit_count)).sum();
        records.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
        records.truncate(STATS_LIMIT);
        Ok(StoreStats {
            total_entries,
            total_visits,
            recent: records,
        })
    }

    pub fn delete_visit(&self, id: &str) -> Result<()> {
        let _guard = self.read_gate();
        self.store.delete_record(&VisitId::from_raw(id))
    }

    /// Validate an import without touching the store.
    pub fn import_preview(&self, content: &str) -> Result<ImportPreview> {
        let _guard = self.read_gate();
        let lines = import::parse_lines(content);
        let mut preview = ImportPreview {
            total: lines.len(),
            ..Default::default()
        };
        for line in lines {
            match self.fingerprint(&import::coerce_url(line))? {
                Some(_) => preview.valid += 1,
                None => preview.invalid += 1,
            }
        }
        Ok(preview)
    }

    /// Import addresses, one per line. Bad lines are counted, never fatal.
    pub fn import_addresses(&self, content: &str) -> Result<ImportOutcome> {
        let _guard = self.read_gate();
        let lines = import::parse_lines(content);
        let mut outcome = ImportOutcome {
            total: lines.len(),
            ..Default::default()
        };
        for line in lines {
            match self.fingerprint(&import::coerce_url(line))? {
                Some(fingerprint) => {
                    self.upsert(&fingerprint, false)?;
                    outcome.imported += 1;
                }
                None => outcome.invalid += 1,
            }
        }
        debug!(
            "imported {} addresses, {} invalid",
            outcome.imported, outcome.invalid
        );
        Ok(outcome)
    }

    pub fn export_csv(&self, options: ExportOptions) -> Result<ExportFile> {
        let _guard = self.read_gate();
        let records = self.store.all_records()?;
        let artifact = export::export_csv(&records, options);
        Ok(ExportFile {
            filename: export::csv_filename(&self.options.filename_prefix, Utc::now()),
            content: artifact.content,
            exported: artifact.exported,
        })
    }

    pub fn export_txt(&self, options: ExportOptions) -> Result<ExportFile> {
        let _guard = self.read_gate();
        let records = self.store.all_records()?;
        let artifact = export::export_txt(&records, options);
        Ok(ExportFile {
            filename: export::txt_filename(&self.options.filename_prefix, Utc::now()),
            content: artifact.content,
            exported: artifact.exported,
        })
    }

    pub fn encryption_enabled(&self) -> Result<bool> {
        self.settings.encryption_enabled(&self.store)
    }

    pub fn set_encryption_enabled(&self, enabled: bool) -> Result<()> {
        let _guard = self.read_gate();
        self.settings.set_encryption_enabled(&self.store, enabled)
    }

    pub fn match_exceptions(&self) -> Result<Vec<String>> {
        Ok(self.exceptions()?.match_hosts())
    }

    pub fn partial_exceptions(&self) -> Result<Vec<String>> {
        Ok(self.exceptions()?.partial_hosts())
    }

    pub fn set_match_exceptions(&self, items: Vec<String>) -> Result<Vec<String>> {
        let _guard = self.read_gate();
        let lists = self
            .settings
            .set_match_exceptions(&self.store, &self.defaults, items)?;
        Ok(lists.match_hosts())
    }

    pub fn set_partial_exceptions(&self, items: Vec<String>) -> Result<Vec<String>> {
        let _guard = self.read_gate();
        let lists = self
            .settings
            .set_partial_exceptions(&self.store, &self.defaults, items)?;
        Ok(lists.partial_hosts())
    }

    /// Snapshot and encrypt the whole store.
    pub fn create_backup(&self, password: &str) -> Result<BackupFile> {
        let _guard = self.read_gate();
        // Make sure the pepper exists so the backup carries it; restoring
        // it is what keeps hashed records matchable on the other side.
        self.pepper()?;
        let envelope = backup::create_backup(&self.store, password)?;
        Ok(BackupFile {
            filename: export::backup_filename(&self.options.filename_prefix, Utc::now()),
            envelope,
        })
    }

    /// Decrypt, validate, and apply a backup. Runs as a critical section:
    /// no other store access can interleave with the clear-and-rewrite.
    pub fn restore_backup(
        &self,
        password: &str,
        envelope: &BackupEnvelope,
        merge_visits: bool,
    ) -> Result<()> {
        // KDF work happens before taking the write gate so concurrent
        // lookups are only blocked for the actual store swap.
        let payload = backup::decrypt_payload(password, envelope)?;
        let _guard = self.write_gate();
        backup::apply_restore(&self.store, payload, RestoreOptions { merge_visits })?;
        self.invalidate_caches();
        Ok(())
    }

    /// A tab was closed; drop its transient state.
    pub fn tab_removed(&self, tab_id: u64) {
        self.sessions.remove(tab_id);
    }

    /// Drop every cache derived from store contents. The next operation
    /// re-reads pepper, settings, and exception lists from storage.
    fn invalidate_caches(&self) {
        *lock(&self.pepper) = None;
        self.settings.invalidate();
        self.sessions.clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
