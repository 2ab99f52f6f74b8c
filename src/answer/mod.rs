//! Answer orchestration: optional web context, model dispatch, streamed text.

pub mod input;
pub mod prompt;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::{backend_for, GenerationRequest, TextStream};
use crate::config::Config;
use crate::error::Result;
use crate::extract::PageExtractor;
use crate::router::ModelRouter;
use crate::search::SearchRouter;

pub use input::ChatInput;
pub use prompt::{error_reply, SourceContext, SETUP_GUIDANCE, SYSTEM_INSTRUCTION};

/// UTF-8 text chunks for the response body. Failures are already rendered
/// as text, so the stream itself cannot fail.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Composes search, extraction and model dispatch for one prompt at a time.
pub struct AnswerOrchestrator {
    config: Arc<Config>,
    router: ModelRouter,
    search: Arc<SearchRouter>,
    extractor: PageExtractor,
    client: Client,
}

impl AnswerOrchestrator {
    pub fn new(
        config: Arc<Config>,
        client: Client,
        search: Arc<SearchRouter>,
        extractor: PageExtractor,
    ) -> Self {
        Self {
            router: ModelRouter::new(config.clone()),
            config,
            search,
            extractor,
            client,
        }
    }

    /// Answer a prompt as a text stream.
    ///
    /// Never fails: missing credentials in production yield the setup
    /// guidance, and any error becomes an apology line in the stream.
    pub async fn answer(&self, input: ChatInput) -> AnswerStream {
        if self.config.deployment.is_production() && !self.config.credentials.has_model_provider()
        {
            info!("No model credentials configured, returning setup guidance");
            return single(SETUP_GUIDANCE.to_string());
        }

        match self.start(&input).await {
            Ok(tokens) => Box::pin(tokens.map(|item| match item {
                Ok(text) => Bytes::from(text),
                Err(e) => {
                    error!(error = %e, "Model stream failed");
                    Bytes::from(error_reply(&e.to_string()))
                }
            })),
            Err(e) => {
                error!(error = %e, "Model dispatch failed");
                single(error_reply(&e.to_string()))
            }
        }
    }

    async fn start(&self, input: &ChatInput) -> Result<TextStream> {
        let selection = self.router.resolve(input.model.as_deref());
        info!(
            model = %selection.model(),
            provider = %selection.provider(),
            "Answering prompt"
        );

        let prompt = if self.wants_search(input) {
            let sources = self.gather_sources(&input.prompt, input.max_results).await;
            prompt::with_sources(&input.prompt, &sources)
        } else {
            input.prompt.clone()
        };

        let generation = &self.config.generation;
        let request = GenerationRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt,
            temperature: generation.temperature,
            max_output_tokens: generation.output_cap(),
            top_p: generation.nucleus(),
        };

        backend_for(selection, self.client.clone())
            .stream(&request)
            .await
    }

    fn wants_search(&self, input: &ChatInput) -> bool {
        !input.prompt.trim().is_empty()
            && input
                .search
                .unwrap_or(self.config.search.enabled_by_default)
    }

    /// Search the prompt and read the top result pages, one at a time.
    ///
    /// Degrades instead of failing: no search means no sources, and a page
    /// that cannot be read contributes its snippet.
    async fn gather_sources(&self, query: &str, max_results: Option<usize>) -> Vec<SourceContext> {
        let response = match self.search.search(query, max_results).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Search failed, answering without sources");
                return Vec::new();
            }
        };

        let settings = &self.config.search;
        let mut sources = Vec::with_capacity(response.results.len());
        for (i, item) in response.results.into_iter().enumerate() {
            let snippet = item.snippet.unwrap_or_default();
            let text = if i < settings.max_pages {
                match self.extractor.extract(&item.url).await {
                    Ok(page) if !page.text_content().is_empty() => {
                        prompt::truncate_chars(page.text_content(), settings.max_chars_per_page)
                            .to_string()
                    }
                    Ok(_) => snippet,
                    Err(e) => {
                        warn!(url = %item.url, error = %e, "Page extraction failed, using snippet");
                        snippet
                    }
                }
            } else {
                snippet
            };

            sources.push(SourceContext {
                title: item.title,
                url: item.url,
                text,
            });
        }

        info!(sources = sources.len(), provider = %response.provider, "Gathered sources");
        sources
    }
}

fn single(text: String) -> AnswerStream {
    Box::pin(stream::once(async move { Bytes::from(text) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn orchestrator(pairs: &[(&str, &str)]) -> AnswerOrchestrator {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Arc::new(Config::from_lookup(move |name| vars.get(name).cloned()).unwrap());
        let client = Client::new();
        let search = Arc::new(SearchRouter::new(&config, client.clone()));
        let extractor = PageExtractor::new(client.clone(), Duration::from_secs(2));
        AnswerOrchestrator::new(config, client, search, extractor)
    }

    async fn collect_text(stream: AnswerStream) -> String {
        let chunks: Vec<Bytes> = stream.collect().await;
        chunks
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[tokio::test]
    async fn production_without_credentials_returns_guidance() {
        let orchestrator = orchestrator(&[("NODE_ENV", "production"), ("TAVILY_API_KEY", "tvly")]);
        let text = collect_text(orchestrator.answer(ChatInput::new("hello")).await).await;
        assert_eq!(text, SETUP_GUIDANCE);
    }

    #[tokio::test]
    async fn unreachable_backend_becomes_apology() {
        let orchestrator = orchestrator(&[("OPENAI_BASE_URL", "http://127.0.0.1:1/v1")]);
        let text = collect_text(orchestrator.answer(ChatInput::new("hello")).await).await;
        assert!(text.starts_with("Sorry, I encountered an error: "));
        assert!(text.ends_with(". Please check your API configuration."));
    }

    #[test]
    fn search_follows_request_then_configuration() {
        let orchestrator = orchestrator(&[]);
        let mut input = ChatInput::new("question");
        assert!(!orchestrator.wants_search(&input));

        input.search = Some(true);
        assert!(orchestrator.wants_search(&input));

        input.prompt = "   ".to_string();
        assert!(!orchestrator.wants_search(&input));
    }
}
