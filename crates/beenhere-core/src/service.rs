use beenhere_protocol::{
    AckResponse, BackupResponse, CheckVisitedLinksResponse, EncryptionEnabledResponse,
    ExceptionListResponse, ExportResponse, ImportPreviewResponse, ImportResponse,
    PartialMatchesResponse, Request, Response, StatsResponse, VisitForUrlResponse,
};

use crate::classify::ClassifyOptions;
use crate::export::ExportOptions;
use crate::record::VisitRecord;
use crate::tracker::Tracker;

/// Dispatch one message-API request.
///
/// Failures never cross this boundary as errors — every outcome is a
/// response payload, with failures shaped as `{ok: false, error}`.
pub fn handle(tracker: &Tracker, request: Request) -> Response {
    match dispatch(tracker, request) {
        Ok(response) => response,
        Err(e) => Response::error(e.to_string()),
    }
}

fn dispatch(tracker: &Tracker, request: Request) -> beenhere_types::Result<Response> {
    match request {
        Request::CheckVisitedLinks {
            links,
            skip_full,
            skip_partial,
        } => {
            let visited_links = tracker.check_links(
                &links,
                ClassifyOptions {
                    skip_full,
                    skip_partial,
                },
            )?;
            Ok(Response::CheckVisitedLinks(CheckVisitedLinksResponse {
                visited_links,
            }))
        }

        Request::GetVisitForUrl { url, tab_id } => {
            let summary = tracker.visit_summary(&url, tab_id)?;
            Ok(Response::VisitForUrl(VisitForUrlResponse {
                visit_count: summary.visit_count,
                last_visited: summary.last_visited,
                match_state: summary.match_state,
            }))
        }

        Request::GetPartialMatches { url } => {
            let items = views(tracker.partial_matches(&url)?);
            Ok(Response::PartialMatches(PartialMatchesResponse { items }))
        }

        Request::GetStats => {
            let stats = tracker.stats()?;
            Ok(Response::Stats(StatsResponse {
                total_entries: stats.total_entries,
                total_visits: stats.total_visits,
                items: views(stats.recent),
            }))
        }

        Request::DeleteVisit { id } => {
            tracker.delete_visit(&id)?;
            Ok(Response::ack())
        }

        Request::ImportAddresses { content, preview } => {
            if preview {
                let preview = tracker.import_preview(&content)?;
                Ok(Response::ImportPreview(ImportPreviewResponse {
                    ok: true,
                    valid: preview.valid,
                    invalid: preview.invalid,
                    total: preview.total,
                }))
            } else {
                let outcome = tracker.import_addresses(&content)?;
                Ok(Response::Import(ImportResponse {
                    ok: true,
                    imported: outcome.imported,
                    invalid: outcome.invalid,
                    total: outcome.total,
                }))
            }
        }

        Request::ExportVisitsCsv {
            include_pages,
            include_downloads,
        } => {
            let file = tracker.export_csv(ExportOptions {
                include_pages,
                include_downloads,
            })?;
            Ok(Response::Export(ExportResponse {
                ok: true,
                exported: file.exported,
                filename: file.filename,
                content: file.content,
            }))
        }

        Request::ExportVisitsTxt {
            include_pages,
            include_downloads,
        } => {
            let file = tracker.export_txt(ExportOptions {
                include_pages,
                include_downloads,
            })?;
            Ok(Response::Export(ExportResponse {
                ok: true,
                exported: file.exported,
                filename: file.filename,
                content: file.content,
            }))
        }

        Request::GetEncryptionEnabled => {
            let encryption_enabled = tracker.encryption_enabled()?;
            Ok(Response::EncryptionEnabled(EncryptionEnabledResponse {
                encryption_enabled,
            }))
        }

        Request::SetEncryptionEnabled { enabled } => {
            tracker.set_encryption_enabled(enabled)?;
            Ok(Response::ack())
        }

        Request::CreateBackupDownload { password } => {
            let file = tracker.create_backup(&password)?;
            Ok(Response::Backup(BackupResponse {
                ok: true,
                filename: file.filename,
                envelope: file.envelope,
            }))
        }

        Request::RestoreBackup {
            password,
            envelope,
            merge_visits,
        } => {
            tracker.restore_backup(&password, &envelope, merge_visits)?;
            Ok(Response::Ack(AckResponse { ok: true }))
        }

        Request::GetPartialExceptions => Ok(Response::ExceptionList(ExceptionListResponse {
            ok: true,
            items: tracker.partial_exceptions()?,
        })),

        Request::SetPartialExceptions { items } => {
            let items = tracker.set_partial_exceptions(items)?;
            Ok(Response::ExceptionList(ExceptionListResponse {
                ok: true,
                items,
            }))
        }

        Request::GetMatchExceptions => Ok(Response::ExceptionList(ExceptionListResponse {
            ok: true,
            items: tracker.match_exceptions()?,
        })),

        Request::SetMatchExceptions { items } => {
            let items = tracker.set_match_exceptions(items)?;
            Ok(Response::ExceptionList(ExceptionListResponse {
                ok: true,
                items,
            }))
        }
    }
}

fn views(records: Vec<VisitRecord>) -> Vec<beenhere_protocol::VisitRecordView> {
    records.iter().map(VisitRecord::to_view).collect()
}
