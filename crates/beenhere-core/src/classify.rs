use std::collections::HashSet;

use beenhere_types::error::Result;
use beenhere_types::MatchState;

use crate::fingerprint::Fingerprint;
use crate::record::VisitRecord;
use crate::settings::ExceptionLists;
use crate::store::VisitStore;

/// Caller-requested filters, composable with exception-list suppression.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    pub skip_full: bool,
    pub skip_partial: bool,
}

/// Result of classifying a fingerprint against the store.
#[derive(Debug, Clone)]
pub struct Classification {
    pub state: MatchState,
    pub record: Option<VisitRecord>,
}

impl Classification {
    fn none() -> Self {
        Self {
            state: MatchState::None,
            record: None,
        }
    }
}

/// Look up a record matching the fingerprint exactly, probing the hashed
/// identity first, then the plaintext one.
pub fn find_full(store: &VisitStore, fingerprint: &Fingerprint) -> Result<Option<VisitRecord>> {
    for id in fingerprint.candidate_ids() {
        if let Some(record) = store.get_record(&id)? {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Partial-match rule: identical host and path in the record's own
/// scheme, and either a differing fragment or a proper non-empty overlap
/// of query parameters. An exactly-equal record never satisfies this —
/// nothing differs — so full matches cannot leak in as partials.
pub fn is_partial_match(record: &VisitRecord, fingerprint: &Fingerprint) -> bool {
    let keys = fingerprint.keys_for(record.identity.is_hashed());
    let record_keys = record.identity.keys();

    if record_keys.host != keys.host || record_keys.path != keys.path {
        return false;
    }

    let fragment_diff = record_keys.fragment != keys.fragment;

    let intersection = count_intersection(&record_keys.params, &keys.params);
    let all_params_equal = record_keys.query == keys.query
        && intersection == record_keys.params.len()
        && intersection == keys.params.len();
    let param_partial = intersection > 0 && !all_params_equal;

    fragment_diff || param_partial
}

/// How many of the fingerprint's parameter keys appear among the
/// record's stored parameter keys.
fn count_intersection(record_params: &[String], fingerprint_params: &[String]) -> usize {
    if record_params.is_empty() || fingerprint_params.is_empty() {
        return 0;
    }
    let stored: HashSet<&str> = record_params.iter().map(String::as_str).collect();
    fingerprint_params
        .iter()
        .filter(|param| stored.contains(param.as_str()))
        .count()
}

/// First partial match for the fingerprint, probing records under both
/// candidate host keys in store iteration order.
pub fn find_partial(store: &VisitStore, fingerprint: &Fingerprint) -> Result<Option<VisitRecord>> {
    for host_key in dedup_hosts(fingerprint) {
        for record in store.records_by_host(host_key)? {
            if is_partial_match(&record, fingerprint) {
                return Ok(Some(record));
            }
        }
    }
    Ok(None)
}

/// Up to `limit` partial matches, most recently visited first.
pub fn find_partial_matches(
    store: &VisitStore,
    fingerprint: &Fingerprint,
    limit: usize,
) -> Result<Vec<VisitRecord>> {
    let mut results = Vec::new();
    for host_key in dedup_hosts(fingerprint) {
        for record in store.records_by_host(host_key)? {
            if is_partial_match(&record, fingerprint) {
                results.push(record);
            }
        }
    }
    results.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
    results.truncate(limit);
    Ok(results)
}

fn dedup_hosts(fingerprint: &Fingerprint) -> Vec<&str> {
    let [hash_host, plain_host] = fingerprint.candidate_hosts();
    if hash_host == plain_host {
        vec![hash_host]
    } else {
        vec![hash_host, plain_host]
    }
}

/// Classify a fingerprint: full, partial, or none.
///
/// Raw classification runs first; exception-list suppression and the
/// caller's skip flags then apply as independent filters. A suppressed
/// full match can still surface as partial when some other record
/// satisfies the partial rule and partial itself is not filtered.
pub fn classify(
    store: &VisitStore,
    fingerprint: &Fingerprint,
    exceptions: &ExceptionLists,
    options: ClassifyOptions,
) -> Result<Classification> {
    let host = &fingerprint.parts.host;
    let full_allowed = !options.skip_full && !exceptions.is_match_excepted(host);
    let partial_allowed = !options.skip_partial && !exceptions.is_partial_excepted(host);

    if full_allowed {
        if let Some(record) = find_full(store, fingerprint)? {
            return Ok(Classification {
                state: MatchState::Full,
                record: Some(record),
            });
        }
    }

    if partial_allowed {
        if let Some(record) = find_partial(store, fingerprint)? {
            return Ok(Classification {
                state: MatchState::Partial,
                record: Some(record),
            });
        }
    }

    Ok(Classification::none())
}
