//! Two-tier connection probing.
//!
//! Tier 1 asks the API's own status endpoint; tier 2 falls back to a plain
//! GET on the root path. Tier 2 is best-effort reachability, not
//! API-identity confirmation: any HTTP server that answers 2xx/3xx on its
//! root counts as Connected (unauthenticated).

use seerr_api::error::ApiError;
use seerr_api::traits::ServerApi;
use seerr_core::classify::classify_error;

/// Shown when no endpoint is configured at all; no network call is made.
pub const NO_ENDPOINTS_MESSAGE: &str = "Set a local or remote URL in Settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No probe has run yet.
    #[default]
    Unset,
    Checking,
    Connected,
    Disconnected,
}

/// The single externally visible result of a probe cycle. Replaced
/// atomically by the aggregator, never mutated field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    /// On success, the candidate that answered; on failure, the first
    /// candidate tried (best-effort "what we tried").
    pub base_url_in_use: String,
    pub authenticated: bool,
    pub last_error: String,
    /// Non-empty when the preferred candidate failed and a fallback answered.
    pub fallback_note: String,
}

/// Probe candidates in order. Never fails; every error folds into the
/// returned snapshot.
pub async fn check_connection<S: ServerApi>(api: &S, candidates: &[String]) -> ConnectionSnapshot {
    if candidates.is_empty() {
        return ConnectionSnapshot {
            status: ConnectionStatus::Disconnected,
            last_error: NO_ENDPOINTS_MESSAGE.to_string(),
            ..Default::default()
        };
    }

    let mut last_error = String::new();
    let mut fallback_note = String::new();

    for (index, base) in candidates.iter().enumerate() {
        // Tier 1: the API's own status endpoint.
        match api.check_status(base).await {
            Ok(()) => {
                // Tier 1b: auth probe. Its failure means "not authenticated",
                // never probe failure.
                let authenticated = api.current_user(base).await.is_ok();
                tracing::debug!(base, authenticated, "connected via status endpoint");
                return connected(base, authenticated, &fallback_note);
            }
            Err(err) => {
                last_error = tier_error(&err, "API");
            }
        }

        // Tier 2: some instances serve the API under a different path; a
        // reachable root still means the server exists.
        match api.probe_root(base).await {
            Ok(()) => {
                tracing::debug!(base, "connected via root fallback");
                return connected(base, false, &fallback_note);
            }
            Err(err) => {
                last_error = tier_error(&err, "Server");
            }
        }

        tracing::debug!(base, error = %last_error, "candidate failed both tiers");
        if index == 0 {
            fallback_note = format!("Preferred ({base}) failed: {}.", classify_error(&last_error));
        }
    }

    let final_error = if fallback_note.is_empty() {
        classify_error(&last_error)
    } else {
        format!("{fallback_note} Then: {}", classify_error(&last_error))
    };

    ConnectionSnapshot {
        status: ConnectionStatus::Disconnected,
        base_url_in_use: candidates[0].clone(),
        authenticated: false,
        last_error: final_error,
        fallback_note: String::new(),
    }
}

fn connected(base: &str, authenticated: bool, fallback_note: &str) -> ConnectionSnapshot {
    let fallback_note = if fallback_note.is_empty() {
        String::new()
    } else {
        format!("{fallback_note} Using fallback.")
    };
    ConnectionSnapshot {
        status: ConnectionStatus::Connected,
        base_url_in_use: base.to_string(),
        authenticated,
        last_error: String::new(),
        fallback_note,
    }
}

fn tier_error(err: &ApiError, label: &str) -> String {
    match err.status() {
        Some(status) => format!("{label} returned {status}"),
        None => err.to_string(),
    }
}
