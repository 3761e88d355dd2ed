//! Candidate base-URL resolution.
//!
//! Derives the ordered list of server addresses to attempt from the endpoint
//! configuration. Pure functions; the prober decides what is actually
//! reachable.

use serde::{Deserialize, Serialize};

/// How the remote address is derived when remote access is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Cloudflare quick tunnel: `https://{id}.trycloudflare.com`.
    Tunnel,
    /// A user-supplied base URL.
    Custom,
}

impl RemoteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tunnel => "tunnel",
            Self::Custom => "custom",
        }
    }
}

/// Snapshot of the user's endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub local_url: String,
    pub remote_enabled: bool,
    pub remote_mode: RemoteMode,
    pub tunnel_id: String,
    pub custom_remote_url: String,
    pub prefer_local_first: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            local_url: String::new(),
            remote_enabled: false,
            remote_mode: RemoteMode::Tunnel,
            tunnel_id: String::new(),
            custom_remote_url: String::new(),
            prefer_local_first: true,
        }
    }
}

impl EndpointConfig {
    /// Local candidate, or empty when not configured.
    pub fn local_base_url(&self) -> String {
        self.local_url.trim().to_string()
    }

    /// Remote candidate: tunnel or custom URL, only when remote is enabled.
    pub fn remote_base_url(&self) -> String {
        if !self.remote_enabled {
            return String::new();
        }
        match self.remote_mode {
            RemoteMode::Tunnel => {
                let id = self.tunnel_id.trim();
                if id.is_empty() {
                    String::new()
                } else {
                    format!("https://{id}.trycloudflare.com")
                }
            }
            RemoteMode::Custom => self.custom_remote_url.trim().to_string(),
        }
    }

    /// Ordered candidates for connection attempts, each normalized and
    /// non-blank. Empty when no endpoint is configured; that is an expected
    /// state, not an error.
    pub fn candidates(&self) -> Vec<String> {
        let local = self.local_base_url();
        let remote = self.remote_base_url();
        let ordered = if self.prefer_local_first {
            [local, remote]
        } else {
            [remote, local]
        };
        ordered
            .into_iter()
            .filter(|base| !base.is_empty())
            .map(|base| normalize_base(&base))
            .collect()
    }

    /// First candidate, normalized, or empty. Best-effort; callers wanting
    /// reachability should consult the connection snapshot instead.
    pub fn resolve_base_url(&self) -> String {
        self.candidates().into_iter().next().unwrap_or_default()
    }
}

/// Trim whitespace and any trailing slashes.
pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}
