//! OpenAI transports: the hosted Responses API and OpenAI-compatible
//! chat completions (Ollama, vLLM, gateways).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::sse::relay_text;
use super::{ensure_success, ChatBackend, GenerationRequest, TextStream};
use crate::config::ApiKey;
use crate::error::{Error, Result};
use crate::router::OpenAiMode;

pub struct OpenAiBackend {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<ApiKey>,
    mode: OpenAiMode,
}

#[derive(Serialize)]
struct ResponsesBody<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionsBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl OpenAiBackend {
    pub fn new(
        client: Client,
        model: String,
        base_url: String,
        api_key: Option<ApiKey>,
        mode: OpenAiMode,
    ) -> Self {
        Self {
            client,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            mode,
        }
    }

    fn body(&self, request: &GenerationRequest) -> Result<Value> {
        let value = match self.mode {
            OpenAiMode::Responses => serde_json::to_value(ResponsesBody {
                model: &self.model,
                instructions: &request.system,
                input: &request.prompt,
                stream: true,
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                top_p: request.top_p,
            }),
            OpenAiMode::ChatCompletions => serde_json::to_value(ChatCompletionsBody {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: &request.system,
                    },
                    ChatMessage {
                        role: "user",
                        content: &request.prompt,
                    },
                ],
                stream: true,
                temperature: request.temperature,
                max_tokens: request.max_output_tokens,
                top_p: request.top_p,
            }),
        };
        value.map_err(|e| Error::Internal(format!("Failed to encode request: {}", e)))
    }

    fn url(&self) -> String {
        match self.mode {
            OpenAiMode::Responses => format!("{}/responses", self.base_url),
            OpenAiMode::ChatCompletions => format!("{}/chat/completions", self.base_url),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let url = self.url();
        tracing::debug!(url = %url, model = %self.model, mode = ?self.mode, "Sending model request");

        let mut builder = self.client.post(&url).json(&self.body(request)?);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = ensure_success(builder.send().await?, "openai").await?;

        Ok(match self.mode {
            OpenAiMode::Responses => relay_text(response, responses_delta),
            OpenAiMode::ChatCompletions => relay_text(response, chat_completions_delta),
        })
    }
}

/// Text carried by one Responses API event.
pub(crate) fn responses_delta(payload: &str) -> Result<Option<String>> {
    let Ok(event) = serde_json::from_str::<Value>(payload) else {
        return Ok(None);
    };

    match event["type"].as_str() {
        Some("response.output_text.delta") => Ok(event["delta"].as_str().map(str::to_string)),
        Some("error") => Err(Error::Provider(
            event["message"]
                .as_str()
                .unwrap_or("openai stream error")
                .to_string(),
        )),
        Some("response.failed") => Err(Error::Provider(
            event["response"]["error"]["message"]
                .as_str()
                .unwrap_or("openai response failed")
                .to_string(),
        )),
        _ => Ok(None),
    }
}

/// Text carried by one chat-completions chunk.
pub(crate) fn chat_completions_delta(payload: &str) -> Result<Option<String>> {
    if payload == "[DONE]" {
        return Ok(None);
    }
    let Ok(chunk) = serde_json::from_str::<Value>(payload) else {
        return Ok(None);
    };

    if let Some(message) = chunk["error"]["message"].as_str() {
        return Err(Error::Provider(message.to_string()));
    }

    Ok(chunk["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "You are Clark.".to_string(),
            prompt: "What is Rust?".to_string(),
            temperature: 0.1,
            max_output_tokens: Some(256),
            top_p: None,
        }
    }

    fn backend(mode: OpenAiMode) -> OpenAiBackend {
        OpenAiBackend::new(
            Client::new(),
            "gpt-4o-mini".to_string(),
            "http://localhost:11434/v1/".to_string(),
            None,
            mode,
        )
    }

    #[test]
    fn responses_body_shape() {
        let b = backend(OpenAiMode::Responses);
        assert_eq!(b.url(), "http://localhost:11434/v1/responses");

        let body = b.body(&request()).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["instructions"], "You are Clark.");
        assert_eq!(body["input"], "What is Rust?");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_output_tokens"], 256);
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn chat_completions_body_shape() {
        let b = backend(OpenAiMode::ChatCompletions);
        assert_eq!(b.url(), "http://localhost:11434/v1/chat/completions");

        let body = b.body(&request()).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What is Rust?");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn responses_events() {
        assert_eq!(
            responses_delta(r#"{"type":"response.output_text.delta","delta":"Hel"}"#).unwrap(),
            Some("Hel".to_string())
        );
        assert_eq!(
            responses_delta(r#"{"type":"response.created","response":{}}"#).unwrap(),
            None
        );
        assert_eq!(responses_delta("not json").unwrap(), None);

        let err = responses_delta(
            r#"{"type":"response.failed","response":{"error":{"message":"quota exceeded"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn chat_completions_chunks() {
        assert_eq!(
            chat_completions_delta(
                r#"{"choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#
            )
            .unwrap(),
            Some("Hi".to_string())
        );
        assert_eq!(
            chat_completions_delta(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#)
                .unwrap(),
            None
        );
        assert_eq!(chat_completions_delta("[DONE]").unwrap(), None);
        assert!(chat_completions_delta(r#"{"error":{"message":"model not found"}}"#).is_err());
    }
}
