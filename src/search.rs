//! Web-search tool: result types, the Tavily HTTP client, and the local
//! allow-list filter.
//!
//! The search tool is the only capability exposed to the research agent
//! loops. Its contract is deliberately forgiving: failures surface as
//! [`SearchError`] values that the agent renders into observation text, so
//! a search outage degrades the report instead of aborting it.
//!
//! The domain allow-list is enforced twice: it is sent to the remote API as
//! `include_domains`, and [`retain_allowed_domains`] re-checks every result
//! locally. A result whose URL cannot be parsed, or whose host is outside
//! the list, is dropped before the model ever sees it.

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default endpoint for [`TavilySearch`].
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";

/// One web-search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Content snippet, possibly truncated by [`truncate_snippets`].
    #[serde(default)]
    pub content: String,
    /// Relevance score as reported by the search API.
    #[serde(default)]
    pub score: f32,
    /// Publication date when the source exposes one (free-form string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Abstraction over a web-search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

// ── Result shaping ───────────────────────────────────────────────────────

/// Drop every result whose URL host is not on the allow-list.
///
/// A host matches an allow-list entry when it equals the entry or is a
/// subdomain of it (`export.arxiv.org` matches `arxiv.org`). Unparseable
/// URLs are dropped. An empty allow-list passes everything through.
pub fn retain_allowed_domains(results: &mut Vec<SearchResult>, domains: &[String]) {
    if domains.is_empty() {
        return;
    }
    results.retain(|r| {
        reqwest::Url::parse(&r.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .is_some_and(|host| {
                domains.iter().any(|d| {
                    let d = d.to_ascii_lowercase();
                    host == d || host.ends_with(&format!(".{d}"))
                })
            })
    });
}

/// Truncate each snippet to at most `limit` characters, appending an
/// ellipsis to anything that was cut.
pub fn truncate_snippets(results: &mut [SearchResult], limit: usize) {
    for r in results.iter_mut() {
        if r.content.chars().count() > limit {
            let mut cut: String = r.content.chars().take(limit).collect();
            cut.push('…');
            r.content = cut;
        }
    }
}

/// Render results as the JSON observation fed back to the model.
///
/// JSON rather than prose: the model consolidates several observations into
/// one summary, and a regular structure with explicit `url` and
/// `published_date` fields is what lets it emit citation links and dates.
pub fn format_observation(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found for this query.".to_string();
    }
    serde_json::to_string_pretty(results)
        .unwrap_or_else(|e| format!("Failed to encode search results: {e}"))
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_domains: &'a [String],
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

// ── HTTP client ──────────────────────────────────────────────────────────

/// reqwest-backed [`SearchProvider`] for the Tavily search API.
pub struct TavilySearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    include_domains: Vec<String>,
}

impl TavilySearch {
    pub fn new(
        api_key: impl Into<String>,
        include_domains: Vec<String>,
        timeout_secs: u64,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            api_key: api_key.into(),
            include_domains,
        })
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results,
            include_domains: &self.include_domains,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::RequestFailed(e.to_string())
                }
            })?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let parsed: SearchResponse = response
                    .json()
                    .await
                    .map_err(|e| SearchError::RequestFailed(e.to_string()))?;
                let mut results = parsed.results;
                // The remote already received include_domains; re-check
                // locally so the guarantee does not depend on the remote.
                retain_allowed_domains(&mut results, &self.include_domains);
                results.truncate(max_results);
                debug!("search '{}': {} results", query, results.len());
                Ok(results)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(SearchError::QuotaExceeded),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(SearchError::InvalidApiKey)
            }
            status => Err(SearchError::RequestFailed(format!("HTTP {status}"))),
        }
    }
}
