//! reqwest-backed [`ServerApi`] implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::error::ApiError;
use crate::traits::{DiscoverCategory, DiscoverPage, ServerApi};
use crate::types::{
    CreateRequestBody, DiscoverResponse, LoginRequest, MediaItem, MediaType, SearchResponse,
    SearchResult,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Raw discover/search page size; a full page means more pages may follow.
const PAGE_SIZE: usize = 20;

/// How much of an error response body to surface in messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Where the session cookie comes from. Read on every request, so a login or
/// logout takes effect without rebuilding the client.
pub trait CookieSource: Send + Sync {
    /// Current `Cookie` header value, empty when logged out.
    fn cookie_header(&self) -> String;
}

/// HTTP client for one Seerr-compatible server family. The base URL is an
/// argument per call; candidate selection belongs to the prober.
pub struct SeerrClient {
    http: Client,
    cookies: Arc<dyn CookieSource>,
}

impl SeerrClient {
    pub fn new(cookies: Arc<dyn CookieSource>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, cookies })
    }

    /// Build a request with the session cookie attached when one is stored.
    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.http.request(method, url);
        let cookie = self.cookies.cookie_header();
        let cookie = cookie.trim();
        if cookie.is_empty() {
            builder
        } else {
            builder.header(COOKIE, cookie)
        }
    }

    async fn check_response(resp: Response) -> Result<Response, ApiError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let message = body.chars().take(ERROR_BODY_LIMIT).collect();
            Err(ApiError::Api { status, message })
        }
    }
}

impl ServerApi for SeerrClient {
    async fn check_status(&self, base_url: &str) -> Result<(), ApiError> {
        let base = base_url.trim_end_matches('/');
        let resp = self
            .request(Method::GET, format!("{base}/api/v1/status"))
            .send()
            .await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn current_user(&self, base_url: &str) -> Result<(), ApiError> {
        let base = base_url.trim_end_matches('/');
        let resp = self
            .request(Method::GET, format!("{base}/api/v1/auth/me"))
            .send()
            .await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn probe_root(&self, base_url: &str) -> Result<(), ApiError> {
        let base = base_url.trim_end_matches('/');
        // Plain request, no cookie: this only asks "is anything listening".
        let resp = self.http.get(format!("{base}/")).send().await?;
        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message: String::new(),
            })
        }
    }

    async fn search(&self, base_url: &str, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let base = base_url.trim_end_matches('/');
        tracing::debug!(query, "searching");
        let resp = self
            .request(Method::GET, format!("{base}/api/v1/search"))
            .query(&[("query", query)])
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(body
            .merged()
            .into_iter()
            .map(MediaItem::into_search_result)
            .collect())
    }

    async fn discover(
        &self,
        base_url: &str,
        category: DiscoverCategory,
        page: u32,
    ) -> Result<DiscoverPage, ApiError> {
        let base = base_url.trim_end_matches('/');
        tracing::debug!(category = category.path(), page, "fetching discover page");
        let resp = self
            .request(Method::GET, format!("{base}/api/v1/discover/{}", category.path()))
            .query(&[("page", page.to_string())])
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let body: DiscoverResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(to_discover_page(body.results.unwrap_or_default()))
    }

    async fn create_request(&self, base_url: &str, item: &SearchResult) -> Result<(), ApiError> {
        let base = base_url.trim_end_matches('/');
        let body = CreateRequestBody::for_item(item);
        tracing::debug!(media_id = item.tmdb_id, media_type = %item.media_type, "creating request");
        let resp = self
            .request(Method::POST, format!("{base}/api/v1/request"))
            .json(&body)
            .send()
            .await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn login_local(
        &self,
        base_url: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let base = base_url.trim_end_matches('/');
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        // No cookie here: a stale session must not shadow the fresh login.
        let resp = self
            .http
            .post(format!("{base}/api/v1/auth/local"))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        Ok(fold_set_cookies(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        ))
    }
}

/// Map one raw discover page. `has_next` counts rows before filtering:
/// dropped Person/Collection rows still occupy server-side page slots, and
/// trending mixes them in freely; only movie/tv are showable.
fn to_discover_page(raw: Vec<MediaItem>) -> DiscoverPage {
    let has_next = raw.len() == PAGE_SIZE;
    let items = raw
        .into_iter()
        .filter(|item| {
            item.media_type
                .as_deref()
                .and_then(MediaType::from_raw)
                .is_some()
        })
        .map(MediaItem::into_search_result)
        .collect();
    DiscoverPage { items, has_next }
}

/// Fold `Set-Cookie` headers into a `Cookie` request header value: keep only
/// the name=value before each header's first `;`, joined with `"; "`.
fn fold_set_cookies<'a, I: IntoIterator<Item = &'a str>>(headers: I) -> String {
    headers
        .into_iter()
        .filter_map(|header| {
            let part = header.split(';').next()?.trim();
            if part.is_empty() {
                None
            } else {
                Some(part.to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
