//! Anthropic Messages API transport.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::sse::relay_text;
use super::{ensure_success, ChatBackend, GenerationRequest, TextStream};
use crate::config::ApiKey;
use crate::error::{Error, Result};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when no cap is configured.
const FALLBACK_MAX_TOKENS: u32 = 1024;

pub struct AnthropicBackend {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<ApiKey>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
}

impl AnthropicBackend {
    pub fn new(client: Client, model: String, base_url: String, api_key: Option<ApiKey>) -> Self {
        Self {
            client,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.model,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_output_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            temperature: request.temperature,
            top_p: request.top_p,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let url = format!("{}/messages", self.base_url);
        tracing::debug!(url = %url, model = %self.model, "Sending model request");

        let mut builder = self
            .client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(request));
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        let response = ensure_success(builder.send().await?, "anthropic").await?;
        Ok(relay_text(response, messages_delta))
    }
}

/// Text carried by one Messages stream event.
pub(crate) fn messages_delta(payload: &str) -> Result<Option<String>> {
    let Ok(event) = serde_json::from_str::<Value>(payload) else {
        return Ok(None);
    };

    match event["type"].as_str() {
        Some("content_block_delta") => Ok(event["delta"]["text"].as_str().map(str::to_string)),
        Some("error") => Err(Error::Provider(
            event["error"]["message"]
                .as_str()
                .unwrap_or("anthropic stream error")
                .to_string(),
        )),
        _ => Ok(None),
    }
}
