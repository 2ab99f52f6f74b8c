//! Core types for web search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single search hit, in the order the provider returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Which provider produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    /// Keyed search API, tried first
    Tavily,
    /// Scraped no-script HTML results, the fallback
    DuckDuckGo,
}

impl SearchProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProviderKind::Tavily => "tavily",
            SearchProviderKind::DuckDuckGo => "duckduckgo",
        }
    }
}

impl std::fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results for one query from one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub provider: SearchProviderKind,
    pub query: String,
    pub results: Vec<SearchResultItem>,
}

/// Errors from a single search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search unavailable: {provider} request failed: {source}")]
    Network {
        provider: SearchProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("Search unavailable: {provider} returned HTTP {status}")]
    Status {
        provider: SearchProviderKind,
        status: u16,
    },

    #[error("Search unavailable: {provider} response could not be decoded: {message}")]
    Decode {
        provider: SearchProviderKind,
        message: String,
    },
}

impl SearchError {
    pub fn provider(&self) -> SearchProviderKind {
        match self {
            SearchError::Network { provider, .. }
            | SearchError::Status { provider, .. }
            | SearchError::Decode { provider, .. } => *provider,
        }
    }
}
