use chrono::{DateTime, Utc};

use crate::record::VisitRecord;

/// Which record kinds an export includes.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub include_pages: bool,
    pub include_downloads: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_pages: true,
            include_downloads: true,
        }
    }
}

/// A built export artifact; delivering it as a download is the host's job.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub content: String,
    pub exported: usize,
}

const CSV_HEADER: &str = "address;date;count;type";
const UTF8_BOM: &str = "\u{feff}";

/// Only plaintext records can be exported — hashed ones have no address
/// to print — newest first.
fn exportable(records: &[VisitRecord], options: ExportOptions) -> Vec<&VisitRecord> {
    let mut selected: Vec<&VisitRecord> = records
        .iter()
        .filter(|record| !record.identity.is_hashed())
        .filter(|record| {
            if record.download {
                options.include_downloads
            } else {
                options.include_pages
            }
        })
        .collect();
    selected.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
    selected
}

/// Semicolon-delimited CSV with a UTF-8 BOM so spreadsheet tools detect
/// the encoding.
pub fn export_csv(records: &[VisitRecord], options: ExportOptions) -> ExportArtifact {
    let selected = exportable(records, options);
    let mut lines = Vec::with_capacity(selected.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for record in &selected {
        let address = record.address().unwrap_or_default();
        let date = format_timestamp(record.last_visited);
        let kind = if record.download { "download" } else { "page" };
        lines.push(format!(
            "{};{};{};{}",
            csv_escape(&address),
            csv_escape(&date),
            record.visit_count,
            kind
        ));
    }

    ExportArtifact {
        content: format!("{UTF8_BOM}{}", lines.join("\n")),
        exported: selected.len(),
    }
}

/// Plain text, one address per line.
pub fn export_txt(records: &[VisitRecord], options: ExportOptions) -> ExportArtifact {
    let selected = exportable(records, options);
    let lines: Vec<String> = selected
        .iter()
        .filter_map(|record| record.address())
        .collect();

    ExportArtifact {
        content: lines.join("\n"),
        exported: selected.len(),
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `<prefix>_visits-<millis>.csv`
pub fn csv_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_visits-{}.csv", now.timestamp_millis())
}

/// `<prefix>_visits-<millis>.txt`
pub fn txt_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_visits-{}.txt", now.timestamp_millis())
}

/// `<prefix>_backup-<millis>.bak`
pub fn backup_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_backup-{}.bak", now.timestamp_millis())
}
