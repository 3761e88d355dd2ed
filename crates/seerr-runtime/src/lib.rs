//! Reactive state aggregator for the remote-control client.
//!
//! [`Runtime`] is the single source of truth the presentation layer reads:
//! it owns the connection snapshot, the live search session, and the current
//! request attempt, and coordinates the prober, the search pipeline, and the
//! submit flow. Every update computes a full next state and swaps it in one
//! write, so readers never observe a torn state. Each activity (probe,
//! search, submit) enforces at-most-one-in-flight: a newer operation aborts
//! its predecessor's task and bumps a generation counter that is re-checked
//! inside the state write, so a superseded result can never overwrite a
//! newer one even if it lands late.

pub mod connection;
pub mod request;
pub mod search;

#[cfg(test)]
pub(crate) mod testutil;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use seerr_api::client::CookieSource;
use seerr_api::error::ApiError;
use seerr_api::traits::{DiscoverCategory, DiscoverPage, ServerApi};
use seerr_api::types::SearchResult;
use seerr_core::classify::classify_error;
use seerr_core::resolver::{normalize_base, EndpointConfig};
use seerr_core::settings::Settings;

use connection::{check_connection, ConnectionSnapshot, ConnectionStatus};
use request::{RequestAttempt, RequestStatus};
use search::{SearchSession, SearchStatus, LOGIN_REQUIRED, NO_SERVER};

/// Queries shorter than this never hit the network.
pub const MIN_QUERY_CHARS: usize = 2;

/// Quiet window between keystrokes and the search call.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet window between endpoint edits and the connection probe.
pub const PROBE_DEBOUNCE: Duration = Duration::from_millis(450);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Can't reach server")]
    NotConnected,

    #[error("Login required")]
    LoginRequired,

    #[error("{0}")]
    Server(String),
}

/// Everything the presentation layer reads, as one snapshot.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Mirror of the persisted endpoint settings.
    pub endpoints: EndpointConfig,
    /// Computed remote URL (e.g. the tunnel URL while the user types the ID).
    pub derived_remote_url: String,
    pub connection: ConnectionSnapshot,
    pub search: SearchSession,
    pub request: Option<RequestAttempt>,
}

/// Adapter so the HTTP client reads the session cookie straight from the
/// settings store on every request.
pub struct SettingsCookies(pub Settings);

impl CookieSource for SettingsCookies {
    fn cookie_header(&self) -> String {
        self.0.cookie_header()
    }
}

pub struct Runtime<S> {
    api: S,
    settings: Settings,
    state: RwLock<AppState>,
    /// Completed queries, keyed by exact trimmed query string. Process
    /// lifetime, no eviction; queries are short and result lists small.
    cache: Mutex<HashMap<String, Vec<SearchResult>>>,
    probe_gen: AtomicU64,
    search_gen: AtomicU64,
    request_gen: AtomicU64,
    probe_task: Mutex<Option<JoinHandle<()>>>,
    search_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: ServerApi + 'static> Runtime<S> {
    pub fn new(api: S, settings: Settings) -> Arc<Self> {
        let endpoints = settings.endpoint_config();
        let state = AppState {
            derived_remote_url: endpoints.remote_base_url(),
            endpoints,
            ..Default::default()
        };
        Arc::new(Self {
            api,
            settings,
            state: RwLock::new(state),
            cache: Mutex::new(HashMap::new()),
            probe_gen: AtomicU64::new(0),
            search_gen: AtomicU64::new(0),
            request_gen: AtomicU64::new(0),
            probe_task: Mutex::new(None),
            search_task: Mutex::new(None),
        })
    }

    /// Current snapshot.
    pub fn state(&self) -> AppState {
        self.state.read().expect("state lock").clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Authenticated when the last probe said so or a credential is stored.
    pub fn is_authenticated(&self) -> bool {
        self.state.read().expect("state lock").connection.authenticated || self.settings.has_cookie()
    }

    // ── Endpoint settings ─────────────────────────────────────────────

    pub fn set_local_url(self: &Arc<Self>, value: &str) {
        self.settings.set_local_url(value);
        self.endpoints_changed();
    }

    pub fn set_remote_enabled(self: &Arc<Self>, enabled: bool) {
        self.settings.set_remote_enabled(enabled);
        self.endpoints_changed();
    }

    pub fn set_remote_mode(self: &Arc<Self>, mode: seerr_core::resolver::RemoteMode) {
        self.settings.set_remote_mode(mode);
        self.endpoints_changed();
    }

    pub fn set_tunnel_id(self: &Arc<Self>, value: &str) {
        self.settings.set_tunnel_id(value);
        self.endpoints_changed();
    }

    pub fn set_custom_remote_url(self: &Arc<Self>, value: &str) {
        self.settings.set_custom_remote_url(value);
        self.endpoints_changed();
    }

    pub fn set_prefer_local_first(self: &Arc<Self>, prefer: bool) {
        self.settings.set_prefer_local_first(prefer);
        self.endpoints_changed();
    }

    fn endpoints_changed(self: &Arc<Self>) {
        let endpoints = self.settings.endpoint_config();
        self.swap_state(move |s| {
            s.derived_remote_url = endpoints.remote_base_url();
            s.endpoints = endpoints;
        });
        self.schedule_probe();
    }

    // ── Connection probing ────────────────────────────────────────────

    /// Probe immediately, superseding any scheduled or in-flight probe.
    /// Used on app start, manual refresh, and after login/logout.
    pub async fn refresh_connection(self: &Arc<Self>) {
        let gen = self.begin_probe();
        self.run_probe(gen).await;
    }

    /// Debounced probe for mid-edit endpoint changes; each call restarts
    /// the quiet window.
    pub fn schedule_probe(self: &Arc<Self>) {
        let gen = self.begin_probe();
        let rt = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(PROBE_DEBOUNCE).await;
            rt.run_probe(gen).await;
        });
        *self.probe_task.lock().expect("task lock") = Some(handle);
    }

    fn begin_probe(&self) -> u64 {
        if let Some(task) = self.probe_task.lock().expect("task lock").take() {
            task.abort();
        }
        let gen = self.probe_gen.fetch_add(1, Ordering::SeqCst) + 1;
        self.swap_state(|s| {
            s.connection.status = ConnectionStatus::Checking;
            s.connection.last_error.clear();
            s.connection.fallback_note.clear();
        });
        gen
    }

    async fn run_probe(self: &Arc<Self>, gen: u64) {
        let candidates = self.settings.endpoint_config().candidates();
        let snapshot = check_connection(&self.api, &candidates).await;
        self.apply_if_current(&self.probe_gen, gen, move |s| s.connection = snapshot);
    }

    // ── Search ────────────────────────────────────────────────────────

    /// React to a query-text change: too-short queries reset to idle, the
    /// rest schedule a debounced fetch superseding any in-flight one.
    pub fn set_search_query(self: &Arc<Self>, query: &str) {
        let gen = self.begin_search();
        let trimmed = query.trim().to_string();

        if trimmed.chars().count() < MIN_QUERY_CHARS {
            // Too short to search; not an error.
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search = SearchSession {
                    query: trimmed,
                    ..Default::default()
                };
            });
            return;
        }

        {
            let query = trimmed.clone();
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search.query = query;
                s.search.error.clear();
            });
        }

        let rt = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            rt.fetch_search(gen, trimmed).await;
        });
        *self.search_task.lock().expect("task lock") = Some(handle);
    }

    /// Run the search pipeline without the debounce window and wait for it
    /// to settle. Same cache, preconditions, and supersession rules.
    pub async fn search_now(self: &Arc<Self>, query: &str) -> SearchSession {
        let gen = self.begin_search();
        let trimmed = query.trim().to_string();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search = SearchSession {
                    query: trimmed,
                    ..Default::default()
                };
            });
        } else {
            self.fetch_search(gen, trimmed).await;
        }
        self.state().search
    }

    fn begin_search(&self) -> u64 {
        if let Some(task) = self.search_task.lock().expect("task lock").take() {
            task.abort();
        }
        self.search_gen.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn fetch_search(self: &Arc<Self>, gen: u64, query: String) {
        // Re-validate: the text may have changed while the window elapsed.
        if query.chars().count() < MIN_QUERY_CHARS {
            return;
        }

        let cached = self.cache.lock().expect("cache lock").get(&query).cloned();
        if let Some(results) = cached {
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search = SearchSession::completed(query, results);
            });
            return;
        }

        let base = self.active_base_url();
        if base.is_empty() {
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search = SearchSession::errored(query, NO_SERVER);
            });
            return;
        }
        if !self.is_authenticated() {
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search = SearchSession::errored(query, LOGIN_REQUIRED);
            });
            return;
        }

        {
            let query = query.clone();
            self.apply_if_current(&self.search_gen, gen, move |s| {
                s.search.query = query;
                s.search.status = SearchStatus::Loading;
                s.search.error.clear();
            });
        }

        match self.api.search(&base, &query).await {
            Ok(results) => {
                self.cache
                    .lock()
                    .expect("cache lock")
                    .insert(query.clone(), results.clone());
                self.apply_if_current(&self.search_gen, gen, move |s| {
                    s.search = SearchSession::completed(query, results);
                });
            }
            Err(err) => {
                // Failures are never cached.
                let message = match err.status() {
                    Some(code) => format!("Search failed: {code}"),
                    None => classify_error(&err.to_string()),
                };
                self.apply_if_current(&self.search_gen, gen, move |s| {
                    s.search = SearchSession::errored(query, message);
                });
            }
        }
    }

    // ── Request submission ────────────────────────────────────────────

    /// Submit a media request for the given item and wait for it to settle.
    /// The attempt is visible as Loading before any network byte is sent.
    pub async fn submit_request(self: &Arc<Self>, target: SearchResult) {
        let gen = self.request_gen.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let target = target.clone();
            self.apply_if_current(&self.request_gen, gen, move |s| {
                s.request = Some(RequestAttempt::loading(target));
            });
        }

        let base = self.active_base_url();
        if base.is_empty() {
            self.settle_request(gen, RequestStatus::Failed, NO_SERVER);
            return;
        }
        if !self.is_authenticated() {
            self.settle_request(gen, RequestStatus::Failed, LOGIN_REQUIRED);
            return;
        }

        match self.api.create_request(&base, &target).await {
            Ok(()) => {
                tracing::info!(media_id = target.tmdb_id, "request created");
                self.settle_request(gen, RequestStatus::Success, "");
                // Refresh the originating search so the item shows as
                // Requested on the next render.
                let query = self
                    .state
                    .read()
                    .expect("state lock")
                    .search
                    .query
                    .trim()
                    .to_string();
                self.cache.lock().expect("cache lock").remove(&query);
                if !query.is_empty() {
                    self.set_search_query(&query);
                }
            }
            Err(err) => {
                self.settle_request(gen, RequestStatus::Failed, &submit_error_message(err));
            }
        }
    }

    /// Acknowledge the current attempt. The aggregator never clears one on
    /// its own; display windows are the caller's concern.
    pub fn clear_request_attempt(&self) {
        self.swap_state(|s| s.request = None);
    }

    fn settle_request(&self, gen: u64, status: RequestStatus, error: &str) {
        let error = error.to_string();
        self.apply_if_current(&self.request_gen, gen, move |s| {
            if let Some(attempt) = s.request.as_mut() {
                attempt.status = status;
                attempt.error = error;
            }
        });
    }

    // ── Session ───────────────────────────────────────────────────────

    /// Base URL to offer on the login screen: the base in use when known,
    /// else whatever the settings can resolve.
    pub fn preferred_login_base_url(&self) -> String {
        let base = self
            .state
            .read()
            .expect("state lock")
            .connection
            .base_url_in_use
            .clone();
        if !base.is_empty() {
            return base;
        }
        let config = self.settings.endpoint_config();
        let local = config.local_base_url();
        if !local.is_empty() {
            return normalize_base(&local);
        }
        normalize_base(&config.remote_base_url())
    }

    /// Sign in with email/password. Stores the harvested session cookie and
    /// forces a fresh probe.
    pub async fn login(
        self: &Arc<Self>,
        base_url: &str,
        email: &str,
        password: &str,
    ) -> Result<(), RuntimeError> {
        let base = normalize_base(base_url);
        if base.is_empty() {
            return Err(RuntimeError::Server(
                "Set a server URL in Settings first".to_string(),
            ));
        }
        match self.api.login_local(&base, email.trim(), password).await {
            Ok(cookie) => {
                if !cookie.is_empty() {
                    self.settings.set_cookie_header(&cookie);
                }
                self.refresh_connection().await;
                Ok(())
            }
            Err(ApiError::Api { status, message }) => Err(RuntimeError::Server(format!(
                "Login failed: {status} {message}"
            ))),
            Err(err) => Err(RuntimeError::Server(classify_error(&err.to_string()))),
        }
    }

    /// Clear the stored credential and re-probe.
    pub async fn logout(self: &Arc<Self>) {
        self.settings.clear_auth();
        self.refresh_connection().await;
    }

    // ── Discover ──────────────────────────────────────────────────────

    /// Same preconditions as search: a resolved base URL and a session.
    pub async fn discover(
        &self,
        category: DiscoverCategory,
        page: u32,
    ) -> Result<DiscoverPage, RuntimeError> {
        let base = self.active_base_url();
        if base.is_empty() {
            return Err(RuntimeError::NotConnected);
        }
        if !self.is_authenticated() {
            return Err(RuntimeError::LoginRequired);
        }
        self.api
            .discover(&base, category, page)
            .await
            .map_err(|err| match err.status() {
                Some(code) => RuntimeError::Server(format!("Discover failed: {code}")),
                None => RuntimeError::Server(classify_error(&err.to_string())),
            })
    }

    // ── Internals ─────────────────────────────────────────────────────

    /// Resolved base for outbound calls: the probed base when one is known,
    /// else the first configured candidate.
    fn active_base_url(&self) -> String {
        let base = self
            .state
            .read()
            .expect("state lock")
            .connection
            .base_url_in_use
            .clone();
        if !base.is_empty() {
            base
        } else {
            self.settings.endpoint_config().resolve_base_url()
        }
    }

    /// Compute a full next state and swap it in one write.
    fn swap_state<F: FnOnce(&mut AppState)>(&self, mutate: F) {
        let mut guard = self.state.write().expect("state lock");
        let mut next = guard.clone();
        mutate(&mut next);
        *guard = next;
    }

    /// Like [`Self::swap_state`], but discards the update when the activity
    /// has been superseded. The generation check happens inside the write
    /// lock, so a stale result can never race past a newer one.
    fn apply_if_current<F: FnOnce(&mut AppState)>(&self, counter: &AtomicU64, gen: u64, mutate: F) {
        let mut guard = self.state.write().expect("state lock");
        if counter.load(Ordering::SeqCst) != gen {
            return;
        }
        let mut next = guard.clone();
        mutate(&mut next);
        *guard = next;
    }
}

fn submit_error_message(err: ApiError) -> String {
    match err {
        ApiError::Api { status: 409, .. } => "Already requested".to_string(),
        ApiError::Api {
            status: 403,
            message,
        } => {
            if message.trim().is_empty() {
                "Not allowed to request".to_string()
            } else {
                message
            }
        }
        ApiError::Api { status, message } => {
            if message.trim().is_empty() {
                format!("Request failed: {status}")
            } else {
                message
            }
        }
        // Transport errors surface raw; the attempt overlay shows them as-is.
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{movie, FakeServer};
    use seerr_core::settings::MemoryStore;

    fn settings() -> Settings {
        Settings::new(Arc::new(MemoryStore::new()))
    }

    async fn connected_runtime(server: &FakeServer) -> Arc<Runtime<FakeServer>> {
        let s = settings();
        s.set_local_url("http://h:5055");
        server.endpoint("http://h:5055").up().authed();
        let rt = Runtime::new(server.clone(), s);
        rt.refresh_connection().await;
        assert_eq!(rt.state().connection.status, ConnectionStatus::Connected);
        rt
    }

    async fn wait_for_settled_search(rt: &Arc<Runtime<FakeServer>>) -> SearchSession {
        for _ in 0..1000 {
            let session = rt.state().search;
            match session.status {
                SearchStatus::HasResults | SearchStatus::Empty | SearchStatus::Errored => {
                    return session
                }
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("search never settled: {:?}", rt.state().search);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_keystrokes() {
        let server = FakeServer::new();
        server.search_results("abc", vec![movie(603, "The Matrix")]);
        let rt = connected_runtime(&server).await;

        rt.set_search_query("a");
        assert_eq!(rt.state().search.status, SearchStatus::Idle);
        rt.set_search_query("ab");
        rt.set_search_query("abc");

        let session = wait_for_settled_search(&rt).await;
        assert_eq!(session.status, SearchStatus::HasResults);
        assert_eq!(session.query, "abc");
        assert_eq!(server.search_calls_for("ab"), 0);
        assert_eq!(server.search_calls_for("abc"), 1);
        assert_eq!(server.search_calls_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_never_searches() {
        let server = FakeServer::new();
        let rt = connected_runtime(&server).await;

        rt.set_search_query("a");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(server.search_calls_total(), 0);
        assert_eq!(rt.state().search.status, SearchStatus::Idle);
        assert!(rt.state().search.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network() {
        let server = FakeServer::new();
        server.search_results("matrix", vec![movie(603, "The Matrix")]);
        let rt = connected_runtime(&server).await;

        let first = rt.search_now("matrix").await;
        assert_eq!(first.status, SearchStatus::HasResults);
        let second = rt.search_now("matrix").await;
        assert_eq!(second.status, SearchStatus::HasResults);
        assert_eq!(second.results, first.results);
        assert_eq!(server.search_calls_for("matrix"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_requires_session() {
        let server = FakeServer::new();
        let s = settings();
        s.set_local_url("http://h:5055");
        server.endpoint("http://h:5055").up(); // reachable, not authenticated
        let rt = Runtime::new(server.clone(), s);
        rt.refresh_connection().await;

        let session = rt.search_now("matrix").await;
        assert_eq!(session.status, SearchStatus::Errored);
        assert_eq!(session.error, LOGIN_REQUIRED);
        assert_eq!(server.search_calls_total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stored_cookie_allows_search() {
        let server = FakeServer::new();
        server.search_results("matrix", vec![movie(603, "The Matrix")]);
        let s = settings();
        s.set_local_url("http://h:5055");
        s.set_cookie_header("connect.sid=abc");
        server.endpoint("http://h:5055").up();
        let rt = Runtime::new(server.clone(), s);
        rt.refresh_connection().await;

        let session = rt.search_now("matrix").await;
        assert_eq!(session.status, SearchStatus::HasResults);
        assert_eq!(server.search_calls_for("matrix"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_search_is_discarded() {
        let server = FakeServer::new();
        server.search_results("batman", vec![movie(268, "Batman")]);
        server.search_results("superman", vec![movie(1924, "Superman")]);
        server.search_delay("batman", Duration::from_millis(500));
        let rt = connected_runtime(&server).await;

        let slow = {
            let rt = Arc::clone(&rt);
            tokio::spawn(async move {
                rt.search_now("batman").await;
            })
        };
        // Let the batman fetch reach its network call before superseding it.
        tokio::task::yield_now().await;

        let session = rt.search_now("superman").await;
        assert_eq!(session.status, SearchStatus::HasResults);

        // batman's response arrives later; it must not overwrite superman.
        slow.await.unwrap();
        let final_session = rt.state().search;
        assert_eq!(final_session.query, "superman");
        assert_eq!(final_session.results[0].title, "Superman");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_conflict_keeps_cache() {
        let server = FakeServer::new();
        server.search_results("batman", vec![movie(268, "Batman")]);
        let rt = connected_runtime(&server).await;

        rt.search_now("batman").await;
        let target = rt.state().search.results[0].clone();

        server.create_request_status(409);
        rt.submit_request(target).await;

        let attempt = rt.state().request.expect("attempt present");
        assert_eq!(attempt.status, RequestStatus::Failed);
        assert_eq!(attempt.error, "Already requested");

        // Cache untouched: the re-search is a hit.
        rt.search_now("batman").await;
        assert_eq!(server.search_calls_for("batman"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_success_invalidates_only_origin_query() {
        let server = FakeServer::new();
        server.search_results("batman", vec![movie(268, "Batman")]);
        server.search_results("matrix", vec![movie(603, "The Matrix")]);
        let rt = connected_runtime(&server).await;

        rt.search_now("batman").await;
        rt.search_now("matrix").await;
        let target = rt.state().search.results[0].clone();

        rt.submit_request(target).await;
        let attempt = rt.state().request.expect("attempt present");
        assert_eq!(attempt.status, RequestStatus::Success);

        // The originating query refetches (submit schedules a re-search).
        for _ in 0..1000 {
            if server.search_calls_for("matrix") == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.search_calls_for("matrix"), 2);

        // Other entries stay cached.
        rt.search_now("batman").await;
        assert_eq!(server.search_calls_for("batman"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_endpoints_fails_fast() {
        let server = FakeServer::new();
        let rt = Runtime::new(server.clone(), settings());

        rt.submit_request(movie(603, "The Matrix")).await;
        let attempt = rt.state().request.expect("attempt present");
        assert_eq!(attempt.status, RequestStatus::Failed);
        assert_eq!(attempt.error, NO_SERVER);
        assert_eq!(server.create_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_request_attempt_is_explicit() {
        let server = FakeServer::new();
        server.search_results("batman", vec![movie(268, "Batman")]);
        let rt = connected_runtime(&server).await;

        rt.search_now("batman").await;
        let target = rt.state().search.results[0].clone();
        rt.submit_request(target).await;
        assert!(rt.state().request.is_some());

        rt.clear_request_attempt();
        assert!(rt.state().request.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoint_edits_debounce_probe() {
        let server = FakeServer::new();
        server.endpoint("http://h:5055").up();
        let rt = Runtime::new(server.clone(), settings());

        rt.set_local_url("http://h");
        rt.set_local_url("http://h:50");
        rt.set_local_url("http://h:5055");
        assert_eq!(rt.state().connection.status, ConnectionStatus::Checking);

        for _ in 0..1000 {
            if rt.state().connection.status == ConnectionStatus::Connected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let state = rt.state();
        assert_eq!(state.connection.status, ConnectionStatus::Connected);
        assert_eq!(state.connection.base_url_in_use, "http://h:5055");
        assert_eq!(state.endpoints.local_url, "http://h:5055");
        // Only the last scheduled probe ran.
        assert_eq!(server.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_supersedes_scheduled_probe() {
        let server = FakeServer::new();
        server.endpoint("http://h:5055").up();
        let rt = Runtime::new(server.clone(), settings());

        rt.set_local_url("http://h:5055"); // schedules a debounced probe
        rt.refresh_connection().await; // bypasses the window
        assert_eq!(rt.state().connection.status, ConnectionStatus::Connected);
        let calls_after_refresh = server.status_calls();
        assert_eq!(calls_after_refresh, 1);

        // The superseded scheduled probe never fires.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(server.status_calls(), calls_after_refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_stores_cookie_and_reprobes() {
        let server = FakeServer::new();
        server.endpoint("http://h:5055").up();
        server.login_cookie("connect.sid=s3cret");
        let s = settings();
        s.set_local_url("http://h:5055");
        let rt = Runtime::new(server.clone(), s.clone());

        rt.login("http://h:5055/", "user@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(s.cookie_header(), "connect.sid=s3cret");
        assert_eq!(rt.state().connection.status, ConnectionStatus::Connected);
        assert!(rt.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_cookie_and_reprobes() {
        let server = FakeServer::new();
        server.endpoint("http://h:5055").up();
        let s = settings();
        s.set_local_url("http://h:5055");
        s.set_cookie_header("connect.sid=abc");
        let rt = Runtime::new(server.clone(), s.clone());
        rt.refresh_connection().await;
        assert!(rt.is_authenticated());

        rt.logout().await;
        assert!(!s.has_cookie());
        assert!(!rt.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_requires_endpoint() {
        let server = FakeServer::new();
        let rt = Runtime::new(server.clone(), settings());
        let err = rt.discover(DiscoverCategory::Trending, 1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_requires_session() {
        let server = FakeServer::new();
        let s = settings();
        s.set_local_url("http://h:5055");
        server.endpoint("http://h:5055").up(); // reachable, not authenticated
        let rt = Runtime::new(server.clone(), s);
        rt.refresh_connection().await;

        let err = rt.discover(DiscoverCategory::Trending, 1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::LoginRequired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_passes_through_page() {
        let server = FakeServer::new();
        server.discover_page(vec![movie(268, "Batman")], true);
        let rt = connected_runtime(&server).await;

        let page = rt.discover(DiscoverCategory::Movies, 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_next);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preferred_login_base_url_order() {
        let server = FakeServer::new();
        let s = settings();
        s.set_local_url("http://h:5055/");
        let rt = Runtime::new(server.clone(), s);
        // No probe yet: falls back to the local URL, normalized.
        assert_eq!(rt.preferred_login_base_url(), "http://h:5055");

        let rt = connected_runtime(&server).await;
        assert_eq!(rt.preferred_login_base_url(), "http://h:5055");
    }
}
