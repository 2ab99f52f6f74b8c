//! DuckDuckGo search provider.
//!
//! Scrapes the no-script HTML results page. No API key required, serves as
//! the fallback provider.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

use super::provider::SearchProvider;
use super::types::{SearchError, SearchProviderKind, SearchResultItem};
use crate::extract::BROWSER_USER_AGENT;

/// Result containers that hold both the link and its snippet.
const RESULT_CONTAINER_CLASSES: [&str; 3] = ["result", "result__body", "result__result"];

/// DuckDuckGo HTML search provider (no API key required)
pub struct DuckDuckGoProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl DuckDuckGoProvider {
    pub fn new(client: Client, endpoint: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResultItem>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT, "text/html")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::Network {
                provider: SearchProviderKind::DuckDuckGo,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: SearchProviderKind::DuckDuckGo,
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| SearchError::Decode {
            provider: SearchProviderKind::DuckDuckGo,
            message: e.to_string(),
        })?;

        Ok(parse_results(&html, max_results))
    }

    fn kind(&self) -> SearchProviderKind {
        SearchProviderKind::DuckDuckGo
    }
}

/// Parse a DuckDuckGo HTML results page.
///
/// Every `a.result__a` anchor becomes an item; items whose URL is not
/// absolute http(s) are dropped, then the list is cut to `max_results`.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResultItem> {
    let (Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);

    document
        .select(&link_sel)
        .map(|anchor| {
            let href = anchor.value().attr("href").unwrap_or("");
            let text = anchor.text().collect::<String>();
            let text = text.trim();
            let title = if !text.is_empty() {
                text.to_string()
            } else if !href.is_empty() {
                href.to_string()
            } else {
                "Untitled".to_string()
            };

            SearchResultItem {
                title,
                url: resolve_href(href),
                snippet: snippet_near(&anchor, &snippet_sel),
            }
        })
        .filter(|item| item.url.starts_with("http"))
        .take(max_results)
        .collect()
}

/// Find the snippet inside the closest result container of `anchor`.
fn snippet_near(anchor: &ElementRef<'_>, snippet_sel: &Selector) -> Option<String> {
    let container = anchor.ancestors().filter_map(ElementRef::wrap).find(|el| {
        el.value()
            .classes()
            .any(|class| RESULT_CONTAINER_CLASSES.contains(&class))
    })?;

    let text = container
        .select(snippet_sel)
        .next()?
        .text()
        .collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Unwrap DuckDuckGo redirect links (`//duckduckgo.com/l/?uddg=<target>`).
///
/// Anything that is not a redirect is returned unchanged, so relative links
/// still fail the absolute-URL filter.
fn resolve_href(href: &str) -> String {
    if href.starts_with('/') {
        let absolute = if href.starts_with("//") {
            format!("https:{}", href)
        } else {
            format!("https://duckduckgo.com{}", href)
        };
        if let Ok(parsed) = Url::parse(&absolute) {
            if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
                return target.into_owned();
            }
        }
    }
    href.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="result results_links web-result">
            <div class="links_main result__body">
              <h2 class="result__title">
                <a rel="nofollow" class="result__a" href="https://www.example.com/climate">
                  Climate <b>change</b> explained
                </a>
              </h2>
              <a class="result__snippet" href="https://www.example.com/climate">
                An overview of the causes and effects.
              </a>
            </div>
          </div>
          <div class="result results_links web-result">
            <div class="links_main result__body">
              <h2 class="result__title">
                <a rel="nofollow" class="result__a"
                   href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnews.example.org%2Fstory%3Fid%3D7&amp;rut=abc">
                  Redirected story
                </a>
              </h2>
            </div>
          </div>
          <div class="result">
            <a class="result__a" href="/relative/link">Relative link</a>
            <div class="result__snippet">Should be dropped</div>
          </div>
          <div class="result">
            <a class="result__a" href="http://plain.example.net/">  </a>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_titles_urls_and_snippets() {
        let results = parse_results(RESULTS_PAGE, 10);
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Climate change explained");
        assert_eq!(results[0].url, "https://www.example.com/climate");
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("An overview of the causes and effects.")
        );

        assert_eq!(results[1].title, "Redirected story");
        assert_eq!(results[1].url, "https://news.example.org/story?id=7");
        assert!(results[1].snippet.is_none());
    }

    #[test]
    fn empty_anchor_text_falls_back_to_href() {
        let results = parse_results(RESULTS_PAGE, 10);
        assert_eq!(results[2].title, "http://plain.example.net/");
        assert_eq!(results[2].url, "http://plain.example.net/");
    }

    #[test]
    fn relative_links_are_dropped() {
        let results = parse_results(RESULTS_PAGE, 10);
        assert!(results.iter().all(|r| r.url.starts_with("http")));
        assert!(!results.iter().any(|r| r.title == "Relative link"));
    }

    #[test]
    fn truncates_to_max_results() {
        assert_eq!(parse_results(RESULTS_PAGE, 1).len(), 1);
        assert_eq!(parse_results(RESULTS_PAGE, 2).len(), 2);
        assert!(parse_results(RESULTS_PAGE, 0).is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let html = r#"
            <div class="result"><a class="result__a" href="https://dup.example/">One</a></div>
            <div class="result"><a class="result__a" href="https://dup.example/">Two</a></div>
        "#;
        let results = parse_results(html, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, results[1].url);
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_results("", 5).is_empty());
        assert!(parse_results("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn resolve_href_passthrough_and_redirects() {
        assert_eq!(resolve_href("https://a.example/x"), "https://a.example/x");
        assert_eq!(
            resolve_href("/l/?uddg=https%3A%2F%2Fb.example%2F"),
            "https://b.example/"
        );
        assert_eq!(resolve_href("/about"), "/about");
        assert_eq!(resolve_href(""), "");
    }
}
