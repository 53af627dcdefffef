//! Wire types for the tracker's message-style API.
//!
//! This crate is intentionally minimal: request/response DTOs and payload
//! version constants. No storage I/O, no crypto, no matching logic — the
//! shapes here are what UI collaborators (popup, settings panel, content
//! scripts) exchange with the tracker core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beenhere_crypto::BackupEnvelope;
use beenhere_types::MatchState;

/// Version written into backup payloads by this binary.
pub const PAYLOAD_VERSION: u32 = 1;

/// Oldest backup payload version this binary can restore.
pub const PAYLOAD_VERSION_MIN: u32 = 1;

/// A link submitted for visited-state checking. The token is an opaque
/// caller handle echoed back with the result, so the caller never has to
/// re-derive which DOM node a result belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkQuery {
    pub href: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitedLink {
    pub token: String,
    pub state: MatchState,
}

/// Display projection of a stored visit record.
///
/// For hashed records the address fields are withheld — the UI shows
/// `???` — because the store only holds irreversible digests for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecordView {
    pub id: String,
    pub address: String,
    pub host: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
    pub visit_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_visited: DateTime<Utc>,
    pub hashed: bool,
    pub download: bool,
}

/// Requests accepted by the tracker, tagged the way the host runtime
/// frames extension messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "CHECK_VISITED_LINKS", rename_all = "camelCase")]
    CheckVisitedLinks {
        links: Vec<LinkQuery>,
        #[serde(default)]
        skip_full: bool,
        #[serde(default)]
        skip_partial: bool,
    },

    #[serde(rename = "GET_VISIT_FOR_URL", rename_all = "camelCase")]
    GetVisitForUrl {
        url: String,
        #[serde(default)]
        tab_id: Option<u64>,
    },

    #[serde(rename = "GET_PARTIAL_MATCHES")]
    GetPartialMatches { url: String },

    #[serde(rename = "GET_STATS")]
    GetStats,

    #[serde(rename = "DELETE_VISIT")]
    DeleteVisit { id: String },

    #[serde(rename = "IMPORT_ADDRESSES")]
    ImportAddresses {
        content: String,
        #[serde(default)]
        preview: bool,
    },

    #[serde(rename = "EXPORT_VISITS_CSV", rename_all = "camelCase")]
    ExportVisitsCsv {
        #[serde(default = "default_true")]
        include_pages: bool,
        #[serde(default = "default_true")]
        include_downloads: bool,
    },

    #[serde(rename = "EXPORT_VISITS_TXT", rename_all = "camelCase")]
    ExportVisitsTxt {
        #[serde(default = "default_true")]
        include_pages: bool,
        #[serde(default = "default_true")]
        include_downloads: bool,
    },

    #[serde(rename = "GET_ENCRYPTION_ENABLED")]
    GetEncryptionEnabled,

    #[serde(rename = "SET_ENCRYPTION_ENABLED")]
    SetEncryptionEnabled { enabled: bool },

    #[serde(rename = "CREATE_BACKUP_DOWNLOAD")]
    CreateBackupDownload { password: String },

    #[serde(rename = "RESTORE_BACKUP", rename_all = "camelCase")]
    RestoreBackup {
        password: String,
        envelope: BackupEnvelope,
        #[serde(default)]
        merge_visits: bool,
    },

    #[serde(rename = "GET_PARTIAL_EXCEPTIONS")]
    GetPartialExceptions,

    #[serde(rename = "SET_PARTIAL_EXCEPTIONS")]
    SetPartialExceptions { items: Vec<String> },

    #[serde(rename = "GET_MATCH_EXCEPTIONS")]
    GetMatchExceptions,

    #[serde(rename = "SET_MATCH_EXCEPTIONS")]
    SetMatchExceptions { items: Vec<String> },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckVisitedLinksResponse {
    pub visited_links: Vec<VisitedLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitForUrlResponse {
    pub visit_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_visited: Option<DateTime<Utc>>,
    pub match_state: MatchState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialMatchesResponse {
    pub items: Vec<VisitRecordView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_entries: u64,
    pub total_visits: u64,
    pub items: Vec<VisitRecordView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub ok: bool,
    pub imported: usize,
    pub invalid: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreviewResponse {
    pub ok: bool,
    pub valid: usize,
    pub invalid: usize,
    pub total: usize,
}

/// Export result. The artifact content is returned to the caller, which
/// owns turning it into a download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub ok: bool,
    pub exported: usize,
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionEnabledResponse {
    pub encryption_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResponse {
    pub ok: bool,
    pub filename: String,
    pub envelope: BackupEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionListResponse {
    pub ok: bool,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// All responses the tracker produces. Serialized untagged: each variant
/// is a distinct flat object, mirroring the ad-hoc reply objects the
/// message API promises its callers. Variant order matters for
/// deserialization — `Error` and `ExceptionList` must precede the bare
/// `Ack` shape, which is a subset of both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    CheckVisitedLinks(CheckVisitedLinksResponse),
    VisitForUrl(VisitForUrlResponse),
    PartialMatches(PartialMatchesResponse),
    Stats(StatsResponse),
    Import(ImportResponse),
    ImportPreview(ImportPreviewResponse),
    Export(ExportResponse),
    EncryptionEnabled(EncryptionEnabledResponse),
    Backup(BackupResponse),
    ExceptionList(ExceptionListResponse),
    Error(ErrorResponse),
    Ack(AckResponse),
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse::new(message))
    }

    pub fn ack() -> Self {
        Response::Ack(AckResponse { ok: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tag_matches_message_type() {
        let req = Request::GetStats;
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "GET_STATS");

        let parsed: Request =
            serde_json::from_str(r#"{"type":"SET_ENCRYPTION_ENABLED","enabled":true}"#).unwrap();
        assert!(matches!(
            parsed,
            Request::SetEncryptionEnabled { enabled: true }
        ));
    }

    #[test]
    fn skip_flags_default_to_false() {
        let parsed: Request =
            serde_json::from_str(r#"{"type":"CHECK_VISITED_LINKS","links":[]}"#).unwrap();
        match parsed {
            Request::CheckVisitedLinks {
                skip_full,
                skip_partial,
                ..
            } => {
                assert!(!skip_full);
                assert!(!skip_partial);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn export_filters_default_to_true() {
        let parsed: Request = serde_json::from_str(r#"{"type":"EXPORT_VISITS_CSV"}"#).unwrap();
        match parsed {
            Request::ExportVisitsCsv {
                include_pages,
                include_downloads,
            } => {
                assert!(include_pages);
                assert!(include_downloads);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn response_serializes_flat() {
        let resp = Response::error("boom");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "boom");

        let ack = serde_json::to_value(Response::ack()).unwrap();
        assert_eq!(ack["ok"], true);
        assert!(ack.get("error").is_none());
    }

    #[test]
    fn visit_view_uses_camel_case_and_millis() {
        let view = VisitRecordView {
            id: "a|b|c|d".into(),
            address: "a.com/p".into(),
            host: "a.com".into(),
            path: "/p".into(),
            query: String::new(),
            fragment: String::new(),
            visit_count: 3,
            last_visited: chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            hashed: false,
            download: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["visitCount"], 3);
        assert_eq!(json["lastVisited"], 1_700_000_000_000i64);
    }
}
