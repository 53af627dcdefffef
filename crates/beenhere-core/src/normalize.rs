use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use url::Url;

/// Canonical components of a trackable URL.
///
/// Two raw URLs that differ only in query-parameter order, duplicate
/// ordering, or a trailing path slash normalize to identical parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub host: String,
    pub path: String,
    /// Canonical query: sorted `k=v` tokens joined with `&`.
    pub query: String,
    /// The same tokens individually, for partial-match set intersection.
    pub query_entries: Vec<String>,
    /// Fragment without the leading `#`, not further decoded.
    pub fragment: String,
}

/// Normalize a raw URL string into comparable components.
///
/// Returns `None` for anything that is not a parseable http/https URL —
/// such URLs are untrackable, not errors.
pub fn normalize_url(raw: &str) -> Option<UrlParts> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let mut host = url.host_str()?.to_ascii_lowercase();
    if let Some(port) = url.port() {
        host = format!("{host}:{port}");
    }
    let host = decode_component(&host);

    let mut path = decode_component(&url.path().to_ascii_lowercase());
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }

    let (query, query_entries) = normalize_query(url.query());

    Some(UrlParts {
        host,
        path,
        query,
        query_entries,
        fragment: url.fragment().unwrap_or("").to_string(),
    })
}

/// Percent-decode a component, keeping the encoded original when the
/// decoded bytes are not valid UTF-8.
fn decode_component(value: &str) -> String {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Canonicalize a query string: group values by key, sort keys and each
/// key's values lexicographically, flatten to `k=v` tokens.
fn normalize_query(query: Option<&str>) -> (String, Vec<String>) {
    let Some(query) = query else {
        return (String::new(), Vec::new());
    };
    if query.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let mut entries = Vec::new();
    for (key, mut values) in grouped {
        values.sort();
        for value in values {
            entries.push(format!("{key}={value}"));
        }
    }
    let normalized = entries.join("&");
    (normalized, entries)
}

/// Rebuild a displayable address from plaintext components.
pub fn build_address(host: &str, path: &str, query: &str, fragment: &str) -> String {
    let mut address = format!("{host}{path}");
    if !query.is_empty() {
        address.push('?');
        address.push_str(query);
    }
    if !fragment.is_empty() {
        address.push('#');
        address.push_str(fragment);
    }
    address
}
