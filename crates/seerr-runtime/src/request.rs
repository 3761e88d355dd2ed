//! Media-request attempt state.

use seerr_api::types::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Set before any network byte is sent.
    Loading,
    Success,
    Failed,
}

/// One submit-and-settle attempt. Lives until the caller acknowledges it via
/// the aggregator's clear operation; the core never clears it on a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttempt {
    pub target: SearchResult,
    pub status: RequestStatus,
    pub error: String,
}

impl RequestAttempt {
    pub(crate) fn loading(target: SearchResult) -> Self {
        Self {
            target,
            status: RequestStatus::Loading,
            error: String::new(),
        }
    }
}
