//! Model selection logic.

use std::sync::Arc;

use crate::config::{ApiKey, Config, LOCAL_OLLAMA_BASE_URL};

/// Default model whenever a hosted or compatible OpenAI endpoint is available.
pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4o-mini";

/// Default model for a bare development machine running Ollama.
pub const DEFAULT_LOCAL_MODEL: &str = "mistral";

const ANTHROPIC_PREFIX: &str = "claude";
const HUGGINGFACE_PREFIX: &str = "hf-";
const HOSTED_OPENAI_HOST: &str = "api.openai.com";

/// Which OpenAI wire protocol to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiMode {
    /// Hosted Responses API
    Responses,
    /// `/chat/completions`, understood by compatible servers such as Ollama
    ChatCompletions,
}

/// Provider identity reported for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderIdentity {
    PrimaryHosted,
    SecondaryHosted,
    LocalCompatible,
    FreeTier,
}

impl std::fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderIdentity::PrimaryHosted => "openai",
            ProviderIdentity::SecondaryHosted => "anthropic",
            ProviderIdentity::LocalCompatible => "openai-compatible",
            ProviderIdentity::FreeTier => "huggingface",
        };
        f.write_str(name)
    }
}

/// A resolved model backend. Built per request and never cached.
#[derive(Debug, Clone)]
pub enum ModelSelection {
    OpenAi {
        model: String,
        base_url: String,
        api_key: Option<ApiKey>,
        mode: OpenAiMode,
    },
    Anthropic {
        model: String,
        base_url: String,
        api_key: Option<ApiKey>,
    },
    HuggingFace {
        /// Model id with the `hf-` prefix removed
        model: String,
        base_url: String,
        api_key: Option<ApiKey>,
    },
}

impl ModelSelection {
    pub fn model(&self) -> &str {
        match self {
            ModelSelection::OpenAi { model, .. }
            | ModelSelection::Anthropic { model, .. }
            | ModelSelection::HuggingFace { model, .. } => model,
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            ModelSelection::OpenAi { base_url, .. }
            | ModelSelection::Anthropic { base_url, .. }
            | ModelSelection::HuggingFace { base_url, .. } => base_url,
        }
    }

    pub fn provider(&self) -> ProviderIdentity {
        match self {
            ModelSelection::OpenAi {
                mode: OpenAiMode::Responses,
                ..
            } => ProviderIdentity::PrimaryHosted,
            ModelSelection::OpenAi {
                mode: OpenAiMode::ChatCompletions,
                ..
            } => ProviderIdentity::LocalCompatible,
            ModelSelection::Anthropic { .. } => ProviderIdentity::SecondaryHosted,
            ModelSelection::HuggingFace { .. } => ProviderIdentity::FreeTier,
        }
    }
}

/// Maps requested model names to backends.
///
/// Pure over its argument and the configuration captured at construction: no
/// network I/O, and missing credentials are left for the backend to report.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: Arc<Config>,
}

impl ModelRouter {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Model used when the request names none.
    pub fn default_model(&self) -> String {
        let credentials = &self.config.credentials;
        if let Some(model) = &credentials.default_model {
            return model.clone();
        }
        if self.config.deployment.is_production()
            || credentials.openai_api_key.is_some()
            || credentials.openai_base_url.is_some()
        {
            DEFAULT_HOSTED_MODEL.to_string()
        } else {
            DEFAULT_LOCAL_MODEL.to_string()
        }
    }

    /// Resolve a requested model name (blank counts as absent).
    pub fn resolve(&self, requested: Option<&str>) -> ModelSelection {
        let model = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_model());

        let credentials = &self.config.credentials;
        let endpoints = &self.config.endpoints;
        let lowered = model.to_lowercase();

        let selection = if lowered.starts_with(ANTHROPIC_PREFIX) {
            ModelSelection::Anthropic {
                model,
                base_url: endpoints.anthropic.clone(),
                api_key: credentials.anthropic_api_key.clone(),
            }
        } else if lowered.starts_with(HUGGINGFACE_PREFIX) {
            ModelSelection::HuggingFace {
                model: model
                    .get(HUGGINGFACE_PREFIX.len()..)
                    .unwrap_or_default()
                    .to_string(),
                base_url: endpoints.huggingface.clone(),
                api_key: credentials.huggingface_api_key.clone(),
            }
        } else {
            let (base_url, custom) = self.openai_base_url();
            let mode = if custom && !base_url.contains(HOSTED_OPENAI_HOST) {
                OpenAiMode::ChatCompletions
            } else {
                OpenAiMode::Responses
            };
            ModelSelection::OpenAi {
                model,
                base_url,
                api_key: credentials.openai_api_key.clone(),
                mode,
            }
        };

        tracing::debug!(
            model = %selection.model(),
            provider = %selection.provider(),
            base_url = %selection.base_url(),
            "Resolved model"
        );
        selection
    }

    /// Effective OpenAI base URL, and whether it came from an override.
    ///
    /// The development loopback default counts as an override: Ollama only
    /// serves chat completions, not the Responses API.
    fn openai_base_url(&self) -> (String, bool) {
        let credentials = &self.config.credentials;
        if let Some(url) = &credentials.openai_base_url {
            return (url.clone(), true);
        }
        if credentials.openai_api_key.is_none() && !self.config.deployment.is_production() {
            return (LOCAL_OLLAMA_BASE_URL.to_string(), true);
        }
        (self.config.endpoints.openai.clone(), false)
    }
}
