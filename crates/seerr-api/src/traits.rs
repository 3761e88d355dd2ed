//! Service seam for the request server.
//!
//! The prober and the aggregator are written against [`ServerApi`], not the
//! concrete reqwest client, so connection and orchestration logic can be
//! tested against an in-process fake.

use std::future::Future;

use crate::error::ApiError;
use crate::types::SearchResult;

/// A discovery shelf the server can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverCategory {
    Trending,
    Movies,
    Tv,
}

impl DiscoverCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Trending => "Trending",
            Self::Movies => "Popular Movies",
            Self::Tv => "Popular TV",
        }
    }

    /// Path segment under `/api/v1/discover/`.
    pub fn path(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Movies => "movies",
            Self::Tv => "tv",
        }
    }
}

/// One page of discovery results.
#[derive(Debug, Clone)]
pub struct DiscoverPage {
    pub items: Vec<SearchResult>,
    /// Page-size heuristic: a full page (20 raw items) means more may follow.
    pub has_next: bool,
}

/// The operations the core issues against a candidate server.
///
/// Every method takes the base URL explicitly; which candidate to talk to is
/// the prober's decision, not the client's.
pub trait ServerApi: Send + Sync {
    /// `GET /api/v1/status` — liveness; any 2xx is success.
    fn check_status(&self, base_url: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /api/v1/auth/me` — 2xx means the stored credential is accepted.
    fn current_user(&self, base_url: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Plain GET on the root path, no auth header. 2xx/3xx confirms something
    /// is listening there, nothing more.
    fn probe_root(&self, base_url: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /api/v1/search?query=...`, merged across the response's
    /// results/movies/tv collections.
    fn search(
        &self,
        base_url: &str,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchResult>, ApiError>> + Send;

    /// `GET /api/v1/discover/{category}?page=n`, 1-based pages. Trending rows
    /// that are neither movie nor TV are dropped.
    fn discover(
        &self,
        base_url: &str,
        category: DiscoverCategory,
        page: u32,
    ) -> impl Future<Output = Result<DiscoverPage, ApiError>> + Send;

    /// `POST /api/v1/request` for the given item.
    fn create_request(
        &self,
        base_url: &str,
        item: &SearchResult,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /api/v1/auth/local`. Returns the harvested session cookie
    /// header (possibly empty when the server set none).
    fn login_local(
        &self,
        base_url: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}
