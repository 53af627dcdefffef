use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of classifying a URL against the visit store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    /// No stored record shares this URL's host and path.
    None,
    /// A record shares host and path but differs in fragment and/or a
    /// subset of query parameters.
    Partial,
    /// A record matches host, path, query, and fragment exactly.
    Full,
}

impl MatchState {
    pub fn is_match(self) -> bool {
        !matches!(self, MatchState::None)
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchState::None => "none",
            MatchState::Partial => "partial",
            MatchState::Full => "full",
        };
        write!(f, "{s}")
    }
}
