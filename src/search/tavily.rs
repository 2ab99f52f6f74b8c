//! Tavily search API provider.
//!
//! The primary search path. Results are trusted verbatim: no URL filtering
//! happens here, only the request-side cap.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::provider::SearchProvider;
use super::types::{SearchError, SearchProviderKind, SearchResultItem};
use crate::config::ApiKey;

/// Upper bound Tavily accepts for `max_results` on a basic search.
pub const TAVILY_MAX_RESULTS: usize = 10;

/// Clamp a caller's result count into the range Tavily accepts.
pub fn clamp_max_results(max_results: usize) -> usize {
    max_results.clamp(1, TAVILY_MAX_RESULTS)
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
    snippet: Option<String>,
}

impl From<TavilyResult> for SearchResultItem {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title.unwrap_or_default(),
            url: r.url.unwrap_or_default(),
            snippet: r.content.or(r.snippet),
        }
    }
}

/// Keyed Tavily search client.
pub struct TavilyProvider {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl TavilyProvider {
    pub fn new(client: Client, endpoint: &str, api_key: ApiKey, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: format!("{}/search", endpoint.trim_end_matches('/')),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResultItem>, SearchError> {
        let capped = clamp_max_results(max_results);
        let body = TavilyRequest {
            query,
            max_results: capped,
            search_depth: "basic",
            include_answer: false,
            include_images: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Network {
                provider: SearchProviderKind::Tavily,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: SearchProviderKind::Tavily,
                status: status.as_u16(),
            });
        }

        let data: TavilyResponse = response.json().await.map_err(|e| SearchError::Decode {
            provider: SearchProviderKind::Tavily,
            message: e.to_string(),
        })?;

        Ok(data
            .results
            .into_iter()
            .take(capped)
            .map(SearchResultItem::from)
            .collect())
    }

    fn kind(&self) -> SearchProviderKind {
        SearchProviderKind::Tavily
    }
}
