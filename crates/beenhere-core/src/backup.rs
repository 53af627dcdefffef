use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use beenhere_crypto::{decrypt_with_password, encrypt_with_password, BackupEnvelope};
use beenhere_protocol::{PAYLOAD_VERSION, PAYLOAD_VERSION_MIN};
use beenhere_types::error::{Result, TrackerError};
use beenhere_types::VisitId;

use crate::record::VisitRecord;
use crate::settings::{META_MATCH_EXCEPTIONS, META_PARTIAL_EXCEPTIONS};
use crate::store::{MetaEntry, VisitStore};

/// Decrypted backup contents. Exception lists travel as their own arrays
/// rather than buried in the meta dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    pub version: u32,
    pub visits: Vec<VisitRecord>,
    pub meta: Vec<MetaEntry>,
    pub partial_exceptions: Vec<String>,
    pub match_exceptions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Keep newer local plaintext data by merging instead of replacing.
    pub merge_visits: bool,
}

/// Snapshot the entire store into a payload.
pub fn snapshot(store: &VisitStore) -> Result<BackupPayload> {
    let visits = store.all_records()?;
    let mut meta = store.meta_all()?;

    let mut partial_exceptions = Vec::new();
    let mut match_exceptions = Vec::new();
    meta.retain(|entry| match entry.key.as_str() {
        META_PARTIAL_EXCEPTIONS => {
            partial_exceptions = string_array(&entry.value);
            false
        }
        META_MATCH_EXCEPTIONS => {
            match_exceptions = string_array(&entry.value);
            false
        }
        _ => true,
    });

    Ok(BackupPayload {
        version: PAYLOAD_VERSION,
        visits,
        meta,
        partial_exceptions,
        match_exceptions,
    })
}

fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Snapshot and encrypt the store under `password`.
pub fn create_backup(store: &VisitStore, password: &str) -> Result<BackupEnvelope> {
    let payload = snapshot(store)?;
    let plaintext = serde_json::to_vec(&payload)?;
    encrypt_with_password(password, &plaintext)
}

/// Decrypt and validate a backup payload without touching the store.
///
/// Validation happens before any mutation so a bad file can never leave
/// a half-cleared store behind.
pub fn decrypt_payload(password: &str, envelope: &BackupEnvelope) -> Result<BackupPayload> {
    let plaintext = decrypt_with_password(password, envelope)?;
    let payload: BackupPayload = serde_json::from_slice(&plaintext)
        .map_err(|e| TrackerError::InvalidPayload(e.to_string()))?;
    if payload.version < PAYLOAD_VERSION_MIN || payload.version > PAYLOAD_VERSION {
        return Err(TrackerError::InvalidPayload(format!(
            "unsupported payload version {}",
            payload.version
        )));
    }
    Ok(payload)
}

/// Replace or merge the store contents with a decrypted payload.
///
/// The caller owns serializing this against concurrent store access; see
/// [`Tracker::restore_backup`](crate::tracker::Tracker::restore_backup).
pub fn apply_restore(
    store: &VisitStore,
    payload: BackupPayload,
    options: RestoreOptions,
) -> Result<()> {
    let visits = if options.merge_visits {
        merge_visits(store.all_records()?, payload.visits)
    } else {
        payload.visits
    };

    info!(
        "restoring backup: {} visits (merge={})",
        visits.len(),
        options.merge_visits
    );

    store.clear_all()?;
    for entry in &payload.meta {
        store.meta_set(&entry.key, &entry.value)?;
    }
    store.meta_set(
        META_PARTIAL_EXCEPTIONS,
        &to_string_array(&payload.partial_exceptions),
    )?;
    store.meta_set(
        META_MATCH_EXCEPTIONS,
        &to_string_array(&payload.match_exceptions),
    )?;
    store.put_records(&visits)?;
    Ok(())
}

fn to_string_array(items: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String(s.clone()))
            .collect(),
    )
}

/// Merge strategy for restore-with-merge.
///
/// Only plaintext records are merge-candidates: hashed identities are not
/// comparable across installations with different peppers, so incoming
/// hashed records replace local ones wholesale while plaintext records
/// combine counts and keep whichever side is newer where it matters.
fn merge_visits(local: Vec<VisitRecord>, incoming: Vec<VisitRecord>) -> Vec<VisitRecord> {
    let mut merged: HashMap<VisitId, VisitRecord> = HashMap::new();

    for record in incoming {
        merged.insert(record.id(), record);
    }

    for local_record in local {
        if local_record.identity.is_hashed() {
            continue;
        }
        match merged.get_mut(&local_record.id()) {
            Some(incoming_record) if !incoming_record.identity.is_hashed() => {
                incoming_record.visit_count = incoming_record
                    .visit_count
                    .saturating_add(local_record.visit_count);
                incoming_record.last_visited =
                    incoming_record.last_visited.max(local_record.last_visited);
                incoming_record.download |= local_record.download;
            }
            Some(_) => {}
            None => {
                merged.insert(local_record.id(), local_record);
            }
        }
    }

    merged.into_values().collect()
}
