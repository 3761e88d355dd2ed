//! In-process [`ServerApi`] fake for prober and aggregator tests.
//!
//! Configured per base URL; unconfigured endpoints answer like a host that
//! refuses TCP connections. All setters take `&self` so a clone handed to the
//! runtime and the handle kept by the test share one state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seerr_api::error::ApiError;
use seerr_api::traits::{DiscoverCategory, DiscoverPage, ServerApi};
use seerr_api::types::{Availability, MediaType, SearchResult};

pub(crate) fn movie(tmdb_id: i64, title: &str) -> SearchResult {
    SearchResult {
        id: format!("movie_{tmdb_id}"),
        tmdb_id,
        media_type: MediaType::Movie,
        title: title.to_string(),
        year: "1999".to_string(),
        poster_path: None,
        availability: Availability::Unknown,
    }
}

#[derive(Clone)]
enum Answer {
    Ok,
    Status(u16),
    Unreachable(String),
}

impl Answer {
    fn resolve(&self) -> Result<(), ApiError> {
        match self {
            Self::Ok => Ok(()),
            Self::Status(code) => Err(ApiError::Api {
                status: *code,
                message: String::new(),
            }),
            Self::Unreachable(message) => Err(ApiError::Transport(message.clone())),
        }
    }
}

#[derive(Clone)]
struct Endpoint {
    status: Answer,
    me: Answer,
    root: Answer,
}

impl Default for Endpoint {
    fn default() -> Self {
        let refused = "error trying to connect: tcp connect error".to_string();
        Self {
            status: Answer::Unreachable(refused.clone()),
            me: Answer::Status(401),
            root: Answer::Unreachable(refused),
        }
    }
}

#[derive(Default)]
struct Inner {
    endpoints: HashMap<String, Endpoint>,
    search_results: HashMap<String, Vec<SearchResult>>,
    search_delays: HashMap<String, Duration>,
    search_calls: HashMap<String, usize>,
    discover_items: Vec<SearchResult>,
    discover_has_next: bool,
    create_status: Option<u16>,
    login_cookie: String,
    status_calls: usize,
    me_calls: usize,
    root_calls: usize,
    create_calls: usize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeServer {
    inner: Arc<Mutex<Inner>>,
}

impl FakeServer {
    pub fn new() -> Self {
        let server = Self::default();
        server.login_cookie("connect.sid=test");
        server
    }

    /// Start configuring the given base URL.
    pub fn endpoint(&self, base: &str) -> EndpointBuilder {
        self.inner
            .lock()
            .unwrap()
            .endpoints
            .entry(base.to_string())
            .or_default();
        EndpointBuilder {
            server: self.clone(),
            base: base.to_string(),
        }
    }

    pub fn search_results(&self, query: &str, results: Vec<SearchResult>) {
        self.inner
            .lock()
            .unwrap()
            .search_results
            .insert(query.to_string(), results);
    }

    /// Delay a query's response; under a paused clock this still resolves
    /// in virtual time.
    pub fn search_delay(&self, query: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .search_delays
            .insert(query.to_string(), delay);
    }

    pub fn discover_page(&self, items: Vec<SearchResult>, has_next: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.discover_items = items;
        inner.discover_has_next = has_next;
    }

    /// Make request creation fail with the given HTTP status.
    pub fn create_request_status(&self, status: u16) {
        self.inner.lock().unwrap().create_status = Some(status);
    }

    pub fn login_cookie(&self, cookie: &str) {
        self.inner.lock().unwrap().login_cookie = cookie.to_string();
    }

    pub fn status_calls(&self) -> usize {
        self.inner.lock().unwrap().status_calls
    }

    pub fn me_calls(&self) -> usize {
        self.inner.lock().unwrap().me_calls
    }

    pub fn root_calls(&self) -> usize {
        self.inner.lock().unwrap().root_calls
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().unwrap().create_calls
    }

    pub fn search_calls_for(&self, query: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .search_calls
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    pub fn search_calls_total(&self) -> usize {
        self.inner.lock().unwrap().search_calls.values().sum()
    }

    fn lookup(&self, base: &str) -> Endpoint {
        self.inner
            .lock()
            .unwrap()
            .endpoints
            .get(base)
            .cloned()
            .unwrap_or_default()
    }
}

/// Chainable endpoint configuration; every call rewrites the shared state.
pub(crate) struct EndpointBuilder {
    server: FakeServer,
    base: String,
}

impl EndpointBuilder {
    fn with(self, mutate: impl FnOnce(&mut Endpoint)) -> Self {
        {
            let mut inner = self.server.inner.lock().unwrap();
            mutate(inner.endpoints.entry(self.base.clone()).or_default());
        }
        self
    }

    /// Status endpoint answers 2xx.
    pub fn up(self) -> Self {
        self.with(|e| e.status = Answer::Ok)
    }

    /// Auth probe accepts the stored credential.
    pub fn authed(self) -> Self {
        self.with(|e| e.me = Answer::Ok)
    }

    /// Status endpoint answers the given HTTP error.
    pub fn api_status(self, code: u16) -> Self {
        self.with(move |e| e.status = Answer::Status(code))
    }

    /// Root path answers 2xx/3xx.
    pub fn root_up(self) -> Self {
        self.with(|e| e.root = Answer::Ok)
    }

    /// Both tiers fail at the transport level with the given message.
    pub fn down(self, message: &str) -> Self {
        let message = message.to_string();
        self.with(move |e| {
            e.status = Answer::Unreachable(message.clone());
            e.root = Answer::Unreachable(message);
        })
    }
}

impl ServerApi for FakeServer {
    async fn check_status(&self, base_url: &str) -> Result<(), ApiError> {
        self.inner.lock().unwrap().status_calls += 1;
        self.lookup(base_url).status.resolve()
    }

    async fn current_user(&self, base_url: &str) -> Result<(), ApiError> {
        self.inner.lock().unwrap().me_calls += 1;
        self.lookup(base_url).me.resolve()
    }

    async fn probe_root(&self, base_url: &str) -> Result<(), ApiError> {
        self.inner.lock().unwrap().root_calls += 1;
        self.lookup(base_url).root.resolve()
    }

    async fn search(&self, _base_url: &str, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let (delay, results) = {
            let mut inner = self.inner.lock().unwrap();
            *inner.search_calls.entry(query.to_string()).or_default() += 1;
            (
                inner.search_delays.get(query).copied().unwrap_or_default(),
                inner.search_results.get(query).cloned().unwrap_or_default(),
            )
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(results)
    }

    async fn discover(
        &self,
        _base_url: &str,
        _category: DiscoverCategory,
        _page: u32,
    ) -> Result<DiscoverPage, ApiError> {
        let inner = self.inner.lock().unwrap();
        Ok(DiscoverPage {
            items: inner.discover_items.clone(),
            has_next: inner.discover_has_next,
        })
    }

    async fn create_request(&self, _base_url: &str, _item: &SearchResult) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_calls += 1;
        match inner.create_status {
            None => Ok(()),
            Some(status) => Err(ApiError::Api {
                status,
                message: String::new(),
            }),
        }
    }

    async fn login_local(
        &self,
        _base_url: &str,
        _email: &str,
        _password: &str,
    ) -> Result<String, ApiError> {
        Ok(self.inner.lock().unwrap().login_cookie.clone())
    }
}
