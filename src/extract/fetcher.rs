//! HTTP page fetching.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::readability::extract_article;
use super::{FetchError, ScrapedPage, BROWSER_USER_AGENT};

/// Fetches pages and runs readable-text extraction over them.
#[derive(Clone)]
pub struct PageExtractor {
    client: Client,
    timeout: Duration,
}

impl PageExtractor {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch `url` and extract its article content.
    ///
    /// Only transport failures and non-success statuses are errors. A page
    /// with no usable content yields an empty `text_content`.
    pub async fn extract(&self, url: &str) -> Result<ScrapedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(parsed.clone())
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            source: e,
        })?;

        let page = extract_article(&html, url);
        info!(url = %url, chars = page.length(), "Extracted page");
        Ok(page)
    }
}
