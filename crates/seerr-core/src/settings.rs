//! Endpoint settings and the key-value persistence contract behind them.
//!
//! The rest of the workspace never touches storage directly: everything goes
//! through [`Settings`], which wraps a [`SettingsStore`]. Production uses the
//! TOML-backed [`FileStore`]; tests substitute [`MemoryStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;

use crate::error::CoreError;
use crate::resolver::{EndpointConfig, RemoteMode};

const KEY_LOCAL_URL: &str = "local_url";
const KEY_REMOTE_ENABLED: &str = "remote_enabled";
const KEY_REMOTE_MODE: &str = "remote_mode";
const KEY_TUNNEL_ID: &str = "tunnel_id";
const KEY_CUSTOM_REMOTE_URL: &str = "custom_remote_url";
const KEY_PREFER_LOCAL_FIRST: &str = "prefer_local_first";
const KEY_COOKIE_HEADER: &str = "auth_cookie";

/// String key-value persistence for endpoint settings and the session cookie.
///
/// Encryption-at-rest is the store's concern, not the caller's.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("settings lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("settings lock")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("settings lock").remove(key);
    }
}

/// TOML-file-backed store. Every `set` rewrites the file; failures to persist
/// are logged and the in-memory value kept, so a read-only disk degrades to
/// session-scoped settings instead of an error on every keystroke.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let values = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw).map_err(|e| CoreError::Settings(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    /// Default settings path (XDG on Linux, AppData on Windows).
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "seerr-remote")
            .map(|d| d.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("settings.toml"))
    }

    fn persist(&self, values: &HashMap<String, String>) {
        let content = match toml::to_string_pretty(values) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("failed to serialize settings: {e}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, content) {
            tracing::warn!("failed to write settings to {}: {e}", self.path.display());
        }
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("settings lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().expect("settings lock");
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock().expect("settings lock");
        values.remove(key);
        self.persist(&values);
    }
}

/// Typed accessors over a [`SettingsStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Open the default file-backed settings.
    pub fn open_default() -> Result<Self, CoreError> {
        let store = FileStore::open(&FileStore::default_path())?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn local_url(&self) -> String {
        self.store.get(KEY_LOCAL_URL).unwrap_or_default()
    }

    pub fn set_local_url(&self, value: &str) {
        self.store.set(KEY_LOCAL_URL, value.trim());
    }

    pub fn remote_enabled(&self) -> bool {
        self.get_bool(KEY_REMOTE_ENABLED, false)
    }

    pub fn set_remote_enabled(&self, enabled: bool) {
        self.set_bool(KEY_REMOTE_ENABLED, enabled);
    }

    pub fn remote_mode(&self) -> RemoteMode {
        match self.store.get(KEY_REMOTE_MODE).as_deref() {
            Some("custom") => RemoteMode::Custom,
            _ => RemoteMode::Tunnel,
        }
    }

    pub fn set_remote_mode(&self, mode: RemoteMode) {
        self.store.set(KEY_REMOTE_MODE, mode.as_str());
    }

    pub fn tunnel_id(&self) -> String {
        self.store.get(KEY_TUNNEL_ID).unwrap_or_default()
    }

    /// Store a tunnel ID. Users sometimes paste the whole tunnel URL; strip it
    /// down to the first host label so the stored value is always an opaque
    /// subdomain label.
    pub fn set_tunnel_id(&self, value: &str) {
        self.store.set(KEY_TUNNEL_ID, &strip_tunnel_id(value));
    }

    pub fn custom_remote_url(&self) -> String {
        self.store.get(KEY_CUSTOM_REMOTE_URL).unwrap_or_default()
    }

    pub fn set_custom_remote_url(&self, value: &str) {
        self.store.set(KEY_CUSTOM_REMOTE_URL, value.trim());
    }

    pub fn prefer_local_first(&self) -> bool {
        self.get_bool(KEY_PREFER_LOCAL_FIRST, true)
    }

    pub fn set_prefer_local_first(&self, prefer: bool) {
        self.set_bool(KEY_PREFER_LOCAL_FIRST, prefer);
    }

    /// Session cookie header, or empty when logged out.
    pub fn cookie_header(&self) -> String {
        self.store.get(KEY_COOKIE_HEADER).unwrap_or_default()
    }

    pub fn set_cookie_header(&self, value: &str) {
        self.store.set(KEY_COOKIE_HEADER, value);
    }

    pub fn has_cookie(&self) -> bool {
        !self.cookie_header().trim().is_empty()
    }

    /// Clear the stored session credential (explicit logout).
    pub fn clear_auth(&self) {
        self.store.remove(KEY_COOKIE_HEADER);
    }

    /// Current endpoint configuration as one immutable value.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            local_url: self.local_url(),
            remote_enabled: self.remote_enabled(),
            remote_mode: self.remote_mode(),
            tunnel_id: self.tunnel_id(),
            custom_remote_url: self.custom_remote_url(),
            prefer_local_first: self.prefer_local_first(),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.store.get(key).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.store.set(key, if value { "true" } else { "false" });
    }
}

/// Reduce a pasted tunnel URL or host to its first label.
/// "https://abc-def.trycloudflare.com/" -> "abc-def"; plain IDs pass through.
fn strip_tunnel_id(value: &str) -> String {
    let trimmed = value.trim();
    let host = if trimmed.contains("://") {
        url::Url::parse(trimmed)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.split(['/', '?']).next().unwrap_or(trimmed).to_string()
    };
    host.split('.').next().unwrap_or(&host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_urls_stored_trimmed() {
        let s = settings();
        s.set_local_url("  http://192.168.1.10:5055  ");
        assert_eq!(s.local_url(), "http://192.168.1.10:5055");
    }

    #[test]
    fn test_defaults() {
        let s = settings();
        assert!(!s.remote_enabled());
        assert!(s.prefer_local_first());
        assert_eq!(s.remote_mode(), RemoteMode::Tunnel);
        assert!(!s.has_cookie());
    }

    #[test]
    fn test_tunnel_id_stripped_from_pasted_url() {
        let s = settings();
        s.set_tunnel_id("https://abc-def-ghi.trycloudflare.com/");
        assert_eq!(s.tunnel_id(), "abc-def-ghi");

        s.set_tunnel_id("abc-def-ghi.trycloudflare.com");
        assert_eq!(s.tunnel_id(), "abc-def-ghi");

        s.set_tunnel_id("  plain-id ");
        assert_eq!(s.tunnel_id(), "plain-id");
    }

    #[test]
    fn test_clear_auth_removes_cookie_only() {
        let s = settings();
        s.set_local_url("http://h:5055");
        s.set_cookie_header("connect.sid=abc");
        assert!(s.has_cookie());
        s.clear_auth();
        assert!(!s.has_cookie());
        assert_eq!(s.local_url(), "http://h:5055");
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("local_url", "http://h:5055");
            store.set("prefer_local_first", "false");
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("local_url").as_deref(), Some("http://h:5055"));
        assert_eq!(store.get("prefer_local_first").as_deref(), Some("false"));
    }
}
