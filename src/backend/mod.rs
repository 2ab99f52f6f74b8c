//! Chat backends: one streaming transport per provider protocol.

pub mod anthropic;
pub mod huggingface;
pub mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::Deserialize;
use std::pin::Pin;

use crate::error::{Error, Result};
use crate::router::ModelSelection;

pub use anthropic::AnthropicBackend;
pub use huggingface::HuggingFaceBackend;
pub use openai::OpenAiBackend;

/// Generated text, delivered in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One model call: fixed system instruction plus the assembled prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A provider transport.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start generation. Errors before the first token are returned here;
    /// later failures arrive as stream items.
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream>;
}

/// Build the transport for a resolved selection.
pub fn backend_for(selection: ModelSelection, client: Client) -> Box<dyn ChatBackend> {
    match selection {
        ModelSelection::OpenAi {
            model,
            base_url,
            api_key,
            mode,
        } => Box::new(OpenAiBackend::new(client, model, base_url, api_key, mode)),
        ModelSelection::Anthropic {
            model,
            base_url,
            api_key,
        } => Box::new(AnthropicBackend::new(client, model, base_url, api_key)),
        ModelSelection::HuggingFace {
            model,
            base_url,
            api_key,
        } => Box::new(HuggingFaceBackend::new(client, model, base_url, api_key)),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Text(String),
}

/// Pull a human-readable message out of a provider error payload.
///
/// Understands `{"error": {"message": ...}}` and `{"error": "..."}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    Some(match parsed.error {
        ErrorDetail::Message { message } => message,
        ErrorDetail::Text(text) => text,
    })
}

/// Pass through success responses; turn anything else into a provider error.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_message(&body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    });

    tracing::error!(provider = %provider, status = status.as_u16(), "Model request failed");
    Err(Error::Provider(format!(
        "{} returned HTTP {}: {}",
        provider,
        status.as_u16(),
        detail
    )))
}
