//! Search session state.

use seerr_api::types::SearchResult;

/// Distinguished error the presentation layer turns into a login action.
/// Never produced by classification; compared verbatim.
pub const LOGIN_REQUIRED: &str = "Login required";

/// Shown when no base URL can be resolved at all.
pub const NO_SERVER: &str = "Can't reach server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    /// No query, or query too short to search.
    #[default]
    Idle,
    Loading,
    HasResults,
    Empty,
    Errored,
}

/// The one live search. Starting a new query supersedes the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSession {
    pub query: String,
    pub status: SearchStatus,
    pub results: Vec<SearchResult>,
    pub error: String,
}

impl SearchSession {
    /// Terminal session for a completed fetch or cache hit.
    pub(crate) fn completed(query: String, results: Vec<SearchResult>) -> Self {
        let status = if results.is_empty() {
            SearchStatus::Empty
        } else {
            SearchStatus::HasResults
        };
        Self {
            query,
            status,
            results,
            error: String::new(),
        }
    }

    pub(crate) fn errored(query: String, message: impl Into<String>) -> Self {
        Self {
            query,
            status: SearchStatus::Errored,
            results: Vec::new(),
            error: message.into(),
        }
    }
}
