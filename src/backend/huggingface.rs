//! Hugging Face Inference transport.
//!
//! Text generation here is a single request/response; the whole completion
//! is emitted as one chunk.

use async_trait::async_trait;
use futures::stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ensure_success, ChatBackend, GenerationRequest, TextStream};
use crate::config::ApiKey;
use crate::error::{Error, Result};

pub struct HuggingFaceBackend {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<ApiKey>,
}

#[derive(Serialize)]
struct InferenceBody {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    return_full_text: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<Generated>),
    Single(Generated),
    Failed { error: String },
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

impl HuggingFaceBackend {
    pub fn new(client: Client, model: String, base_url: String, api_key: Option<ApiKey>) -> Self {
        Self {
            client,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn body(request: &GenerationRequest) -> InferenceBody {
        InferenceBody {
            inputs: format!("{}\n\n{}", request.system, request.prompt),
            parameters: InferenceParameters {
                temperature: request.temperature,
                max_new_tokens: request.max_output_tokens,
                top_p: request.top_p,
                return_full_text: false,
            },
        }
    }
}

#[async_trait]
impl ChatBackend for HuggingFaceBackend {
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        tracing::debug!(url = %url, "Sending model request");

        let mut builder = self.client.post(&url).json(&Self::body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = ensure_success(builder.send().await?, "huggingface").await?;
        let body = response.text().await?;
        let text = generated_text(&body)?;

        let chunks: Vec<Result<String>> = if text.is_empty() {
            vec![]
        } else {
            vec![Ok(text)]
        };
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Completion text from an inference response body.
pub(crate) fn generated_text(body: &str) -> Result<String> {
    let parsed: InferenceResponse = serde_json::from_str(body).map_err(|e| {
        Error::Provider(format!("huggingface returned an unexpected response: {}", e))
    })?;

    match parsed {
        InferenceResponse::Batch(items) => Ok(items
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .unwrap_or_default()),
        InferenceResponse::Single(g) => Ok(g.generated_text),
        InferenceResponse::Failed { error } => Err(Error::Provider(error)),
    }
}
