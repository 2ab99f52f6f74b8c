//! Web search with a keyed primary provider and a scraped fallback.
//!
//! Tavily is tried first when a key is configured; any failure or an empty
//! result set falls through to DuckDuckGo's HTML endpoint. Only fallback
//! failures reach the caller.

pub mod duckduckgo;
pub mod provider;
pub mod tavily;
pub mod types;

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;

pub use duckduckgo::DuckDuckGoProvider;
pub use provider::SearchProvider;
pub use tavily::TavilyProvider;
pub use types::{SearchError, SearchProviderKind, SearchResponse, SearchResultItem};

/// Result count used when the caller does not ask for one.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Resolves queries through the primary/fallback provider chain.
pub struct SearchRouter {
    primary: Option<Box<dyn SearchProvider>>,
    fallback: Box<dyn SearchProvider>,
    default_max_results: usize,
}

impl SearchRouter {
    /// Build the provider chain from configuration, sharing `client`'s pool.
    pub fn new(config: &Config, client: Client) -> Self {
        let timeout = Duration::from_secs(config.search.timeout_secs);

        let primary: Option<Box<dyn SearchProvider>> =
            config.credentials.tavily_api_key.clone().map(|key| {
                debug!("Tavily search provider enabled");
                Box::new(TavilyProvider::new(
                    client.clone(),
                    &config.endpoints.tavily,
                    key,
                    timeout,
                )) as Box<dyn SearchProvider>
            });

        let fallback = Box::new(DuckDuckGoProvider::new(
            client,
            &config.endpoints.duckduckgo,
            timeout,
        ));

        Self {
            primary,
            fallback,
            default_max_results: config.search.max_results,
        }
    }

    /// Assemble a router from explicit providers.
    pub fn with_providers(
        primary: Option<Box<dyn SearchProvider>>,
        fallback: Box<dyn SearchProvider>,
    ) -> Self {
        Self {
            primary,
            fallback,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Search for `query`, returning at most `max_results` items.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        let max_results = max_results.unwrap_or(self.default_max_results);

        if let Some(primary) = &self.primary {
            match primary.search(query, max_results).await {
                Ok(results) if !results.is_empty() => {
                    info!(
                        provider = %primary.kind(),
                        results = results.len(),
                        "Search complete"
                    );
                    return Ok(SearchResponse {
                        provider: primary.kind(),
                        query: query.to_string(),
                        results,
                    });
                }
                Ok(_) => {
                    info!(provider = %primary.kind(), "Primary search returned no results, falling back");
                }
                Err(e) => {
                    warn!(provider = %primary.kind(), error = %e, "Primary search failed, falling back");
                }
            }
        }

        let mut results = self.fallback.search(query, max_results).await?;
        results.truncate(max_results);

        info!(
            provider = %self.fallback.kind(),
            results = results.len(),
            "Search complete"
        );

        Ok(SearchResponse {
            provider: self.fallback.kind(),
            query: query.to_string(),
            results,
        })
    }
}
