//! Search provider trait definition.

use async_trait::async_trait;

use super::types::{SearchError, SearchProviderKind, SearchResultItem};

/// A source of web search results.
///
/// The router holds providers behind this trait so the fallback chain can be
/// exercised with injected providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `max_results` items in provider order.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResultItem>, SearchError>;

    /// Identity reported in `SearchResponse::provider`.
    fn kind(&self) -> SearchProviderKind;
}
