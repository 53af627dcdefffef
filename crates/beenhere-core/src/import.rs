//! Line-oriented address import.
//!
//! One URL per line; blank lines are skipped, lines without a scheme get
//! `https://` prepended. A line that still fails to normalize counts as
//! invalid and never aborts the rest of the file.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportPreview {
    pub valid: usize,
    pub invalid: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub invalid: usize,
    pub total: usize,
}

/// Trimmed, non-empty lines of the submitted text.
pub fn parse_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Default bare addresses to https.
pub fn coerce_url(line: &str) -> String {
    let lower = line.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        line.to_string()
    } else {
        format!("https://{line}")
    }
}
