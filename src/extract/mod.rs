//! Page fetching and readable-text extraction.

pub mod fetcher;
pub mod readability;

use serde::Serialize;
use thiserror::Error;

pub use fetcher::PageExtractor;
pub use readability::extract_article;

/// User agent sent on page fetches and DuckDuckGo requests. Some sites
/// refuse obvious bot agents outright.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Readable content extracted from one page.
///
/// `length` is fixed at construction from `text_content`, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedPage {
    url: String,
    title: String,
    byline: Option<String>,
    excerpt: Option<String>,
    text_content: String,
    length: usize,
}

impl ScrapedPage {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        byline: Option<String>,
        excerpt: Option<String>,
        text_content: impl Into<String>,
    ) -> Self {
        let text_content = text_content.into();
        let length = text_content.chars().count();
        Self {
            url: url.into(),
            title: title.into(),
            byline,
            excerpt,
            text_content,
            length,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn byline(&self) -> Option<&str> {
        self.byline.as_deref()
    }

    pub fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    pub fn text_content(&self) -> &str {
        &self.text_content
    }

    /// Character count of `text_content`.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// Page fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {url} ({status})")]
    Status { url: String, status: u16 },

    #[error("Failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}
