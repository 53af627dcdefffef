use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use beenhere_types::{MatchState, VisitId};

/// Transient per-tab bookkeeping. Never persisted; discarded when the
/// tab goes away or a restore replaces the store wholesale.
#[derive(Debug, Clone, Default)]
struct TabSession {
    /// Identity last upserted for this tab, to avoid double-counting
    /// repeated loads of the same page.
    last_saved_id: Option<VisitId>,
    /// Match state reported for the tab's current page.
    last_state: Option<MatchState>,
    /// The record's visit time *before* the current navigation refreshed
    /// it, so "last seen" answers don't report the visit in progress.
    previous_visit: Option<DateTime<Utc>>,
    /// Set when the current page was stored for the first time by this
    /// tab — reloads should keep reporting "none", not "visited".
    pending_first_visit: bool,
}

#[derive(Default)]
pub struct TabSessions {
    inner: Mutex<HashMap<u64, TabSession>>,
}

impl TabSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut HashMap<u64, TabSession>) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn last_saved_id(&self, tab_id: u64) -> Option<VisitId> {
        self.with(|tabs| tabs.get(&tab_id).and_then(|s| s.last_saved_id.clone()))
    }

    pub fn last_state(&self, tab_id: u64) -> Option<MatchState> {
        self.with(|tabs| tabs.get(&tab_id).and_then(|s| s.last_state))
    }

    pub fn previous_visit(&self, tab_id: u64) -> Option<DateTime<Utc>> {
        self.with(|tabs| tabs.get(&tab_id).and_then(|s| s.previous_visit))
    }

    pub fn pending_first_visit(&self, tab_id: u64) -> bool {
        self.with(|tabs| {
            tabs.get(&tab_id)
                .map(|s| s.pending_first_visit)
                .unwrap_or(false)
        })
    }

    /// Record the outcome of a fresh navigation, before its upsert.
    pub fn begin_visit(
        &self,
        tab_id: u64,
        state: MatchState,
        previous_visit: Option<DateTime<Utc>>,
    ) {
        self.with(|tabs| {
            let session = tabs.entry(tab_id).or_default();
            session.last_state = Some(state);
            session.previous_visit = previous_visit;
            session.pending_first_visit = state == MatchState::None;
        });
    }

    pub fn set_last_saved_id(&self, tab_id: u64, id: VisitId) {
        self.with(|tabs| {
            tabs.entry(tab_id).or_default().last_saved_id = Some(id);
        });
    }

    pub fn set_last_state(&self, tab_id: u64, state: MatchState) {
        self.with(|tabs| {
            tabs.entry(tab_id).or_default().last_state = Some(state);
        });
    }

    /// The tab is gone; drop its transient state.
    pub fn remove(&self, tab_id: u64) {
        self.with(|tabs| {
            tabs.remove(&tab_id);
        });
    }

    pub fn clear(&self) {
        self.with(|tabs| tabs.clear());
    }
}
