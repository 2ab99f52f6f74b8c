//! Configuration parsing and validation for clark.
//!
//! Configuration is an explicit immutable value. Non-secret settings come from
//! an optional TOML file; credentials and the deployment flag always come from
//! the environment. Environment access goes through a lookup closure so the
//! whole pipeline is testable without touching process-global state.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";
pub const ENV_TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const ENV_DEFAULT_MODEL: &str = "DEFAULT_MODEL";
pub const ENV_NODE_ENV: &str = "NODE_ENV";

/// Hosted OpenAI endpoint; any other base URL is treated as a compatible server.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Local Ollama endpoint used in development when nothing else is configured.
pub const LOCAL_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub deployment: Deployment,
    pub credentials: Credentials,
    pub endpoints: EndpointsConfig,
    pub generation: GenerationConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

/// Deployment environment, derived from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    Production,
    Development,
}

impl Deployment {
    /// Only the exact value `production` selects a production deployment.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Deployment::Production,
            _ => Deployment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Deployment::Production
    }
}

impl std::fmt::Display for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deployment::Production => write!(f, "production"),
            Deployment::Development => write!(f, "development"),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// Provider credentials and model overrides read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<ApiKey>,
    pub anthropic_api_key: Option<ApiKey>,
    pub huggingface_api_key: Option<ApiKey>,
    pub tavily_api_key: Option<ApiKey>,
    /// Custom OpenAI-compatible base URL (`OPENAI_BASE_URL`)
    pub openai_base_url: Option<String>,
    /// Explicit default model (`DEFAULT_MODEL`)
    pub default_model: Option<String>,
}

impl Credentials {
    /// Whether any model backend could be reached with this configuration.
    pub fn has_model_provider(&self) -> bool {
        self.openai_api_key.is_some()
            || self.anthropic_api_key.is_some()
            || self.openai_base_url.is_some()
            || self.huggingface_api_key.is_some()
    }

    /// Presence of each recognized credential, for `clark check` and `/health`.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        vec![
            (ENV_OPENAI_API_KEY, self.openai_api_key.is_some()),
            (ENV_ANTHROPIC_API_KEY, self.anthropic_api_key.is_some()),
            (ENV_OPENAI_BASE_URL, self.openai_base_url.is_some()),
            (ENV_HUGGINGFACE_API_KEY, self.huggingface_api_key.is_some()),
            (ENV_TAVILY_API_KEY, self.tavily_api_key.is_some()),
            (ENV_DEFAULT_MODEL, self.default_model.is_some()),
        ]
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:3000")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Upstream endpoints. Overridable so deployments can use gateways and
/// tests can point at local mock servers.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_openai_endpoint")]
    pub openai: String,
    #[serde(default = "default_anthropic_endpoint")]
    pub anthropic: String,
    #[serde(default = "default_huggingface_endpoint")]
    pub huggingface: String,
    #[serde(default = "default_tavily_endpoint")]
    pub tavily: String,
    #[serde(default = "default_duckduckgo_endpoint")]
    pub duckduckgo: String,
}

fn default_openai_endpoint() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_huggingface_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_tavily_endpoint() -> String {
    "https://api.tavily.com".to_string()
}

fn default_duckduckgo_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            openai: default_openai_endpoint(),
            anthropic: default_anthropic_endpoint(),
            huggingface: default_huggingface_endpoint(),
            tavily: default_tavily_endpoint(),
            duckduckgo: default_duckduckgo_endpoint(),
        }
    }
}

/// Fixed generation parameters applied to every model call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output token cap; `0` leaves the cap to the provider.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: Option<u32>,
    /// Nucleus sampling cap; `0.0` disables it.
    #[serde(default = "default_top_p")]
    pub top_p: Option<f32>,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> Option<u32> {
    Some(256)
}

fn default_top_p() -> Option<f32> {
    Some(0.9)
}

impl GenerationConfig {
    pub fn output_cap(&self) -> Option<u32> {
        self.max_output_tokens.filter(|n| *n > 0)
    }

    pub fn nucleus(&self) -> Option<f32> {
        self.top_p.filter(|p| *p > 0.0)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Web search and page extraction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Gather web context for chat requests that don't say either way
    #[serde(default)]
    pub enabled_by_default: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Result pages to extract when gathering context
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_chars_per_page")]
    pub max_chars_per_page: usize,
    /// Per-request timeout for search and page fetches
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_results() -> usize {
    5
}

fn default_max_pages() -> usize {
    3
}

fn default_max_chars_per_page() -> usize {
    2000
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: false,
            max_results: default_max_results(),
            max_pages: default_max_pages(),
            max_chars_per_page: default_max_chars_per_page(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Raw configuration deserialized directly from TOML.
/// Holds only non-secret settings; credentials are overlaid from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    endpoints: EndpointsConfig,
    #[serde(default)]
    generation: GenerationConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Look up an environment value, treating empty strings as unset.
fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

impl Config {
    /// Build the final config from raw file settings and an environment lookup.
    pub fn from_raw_with<F>(raw: RawConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            openai_api_key: non_empty(&lookup, ENV_OPENAI_API_KEY).map(ApiKey::from),
            anthropic_api_key: non_empty(&lookup, ENV_ANTHROPIC_API_KEY).map(ApiKey::from),
            huggingface_api_key: non_empty(&lookup, ENV_HUGGINGFACE_API_KEY).map(ApiKey::from),
            tavily_api_key: non_empty(&lookup, ENV_TAVILY_API_KEY).map(ApiKey::from),
            openai_base_url: non_empty(&lookup, ENV_OPENAI_BASE_URL),
            default_model: non_empty(&lookup, ENV_DEFAULT_MODEL),
        };
        let deployment = Deployment::from_node_env(lookup(ENV_NODE_ENV).as_deref());

        let config = Config {
            server: raw.server,
            deployment,
            credentials,
            endpoints: raw.endpoints,
            generation: raw.generation,
            search: raw.search,
            logging: raw.logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default settings overlaid with the given environment lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_raw_with(RawConfig::default(), lookup)
    }

    /// Default settings overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse TOML settings and overlay the given environment lookup.
    pub fn parse_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        Self::from_raw_with(raw, lookup)
    }

    /// Load a TOML settings file and overlay the process environment.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str_with(&content, |name| std::env::var(name).ok())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Server listen address is empty".to_string(),
            ));
        }

        let endpoints = [
            ("openai", &self.endpoints.openai),
            ("anthropic", &self.endpoints.anthropic),
            ("huggingface", &self.endpoints.huggingface),
            ("tavily", &self.endpoints.tavily),
            ("duckduckgo", &self.endpoints.duckduckgo),
        ];
        for (name, endpoint) in endpoints {
            url::Url::parse(endpoint).map_err(|e| {
                ConfigError::Validation(format!(
                    "Endpoint '{}' is not a valid URL ({}): {}",
                    name, endpoint, e
                ))
            })?;
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(format!(
                "Temperature {} is outside 0.0..=2.0",
                self.generation.temperature
            )));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::Validation(
                "search.max_results must be at least 1".to_string(),
            ));
        }

        if self.deployment.is_production() && !self.credentials.has_model_provider() {
            tracing::warn!(
                "No model credentials configured in production - /api/chat will return setup guidance"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Build a lookup closure over a fixed set of variables.
    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(env_of(&[])).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:3000");
        assert_eq!(config.deployment, Deployment::Development);
        assert!(!config.credentials.has_model_provider());
        assert_eq!(config.generation.output_cap(), Some(256));
        assert_eq!(config.generation.nucleus(), Some(0.9));
        assert_eq!(config.search.max_results, 5);
        assert!(!config.search.enabled_by_default);
    }

    #[test]
    fn test_credentials_from_lookup() {
        let config = Config::from_lookup(env_of(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("TAVILY_API_KEY", "tvly-key"),
            ("DEFAULT_MODEL", "gpt-4o"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();

        assert_eq!(config.deployment, Deployment::Production);
        assert_eq!(
            config.credentials.openai_api_key.as_ref().unwrap().expose_secret(),
            "sk-openai"
        );
        assert_eq!(
            config.credentials.tavily_api_key.as_ref().unwrap().expose_secret(),
            "tvly-key"
        );
        assert_eq!(config.credentials.default_model.as_deref(), Some("gpt-4o"));
        assert!(config.credentials.huggingface_api_key.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = Config::from_lookup(env_of(&[
            ("OPENAI_API_KEY", ""),
            ("OPENAI_BASE_URL", "   "),
            ("DEFAULT_MODEL", ""),
        ]))
        .unwrap();

        assert!(config.credentials.openai_api_key.is_none());
        assert!(config.credentials.openai_base_url.is_none());
        assert!(config.credentials.default_model.is_none());
    }

    #[test]
    fn test_deployment_requires_exact_production() {
        assert_eq!(
            Deployment::from_node_env(Some("production")),
            Deployment::Production
        );
        assert_eq!(
            Deployment::from_node_env(Some("Production")),
            Deployment::Development
        );
        assert_eq!(Deployment::from_node_env(Some("test")), Deployment::Development);
        assert_eq!(Deployment::from_node_env(None), Deployment::Development);
    }

    #[test]
    fn test_huggingface_key_counts_as_model_provider() {
        let config = Config::from_lookup(env_of(&[("HUGGINGFACE_API_KEY", "hf_x")])).unwrap();
        assert!(config.credentials.has_model_provider());
    }

    #[test]
    fn test_tavily_key_alone_is_not_a_model_provider() {
        let config = Config::from_lookup(env_of(&[("TAVILY_API_KEY", "tvly")])).unwrap();
        assert!(!config.credentials.has_model_provider());
    }

    #[test]
    fn test_parse_toml_settings() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:8080"

            [generation]
            temperature = 0.2
            max_output_tokens = 0

            [search]
            enabled_by_default = true
            max_pages = 2

            [endpoints]
            tavily = "http://127.0.0.1:9999"
        "#;

        let config = Config::parse_str_with(toml, env_of(&[])).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.output_cap(), None);
        assert_eq!(config.generation.nucleus(), Some(0.9));
        assert!(config.search.enabled_by_default);
        assert_eq!(config.search.max_pages, 2);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.endpoints.tavily, "http://127.0.0.1:9999");
        assert_eq!(config.endpoints.anthropic, "https://api.anthropic.com/v1");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let toml = r#"
            [endpoints]
            duckduckgo = "not a url"
        "#;

        let err = Config::parse_str_with(toml, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("duckduckgo"));
    }

    #[test]
    fn test_out_of_range_temperature_rejected() {
        let toml = r#"
            [generation]
            temperature = 3.5
        "#;

        let err = Config::parse_str_with(toml, env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("Temperature"));
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("super-secret-token");
        let debug_output = format!("{:?}", key);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_display_redaction() {
        let key = ApiKey::from("super-secret-token");
        assert_eq!(format!("{}", key), "[REDACTED]");
    }

    #[test]
    fn test_api_key_serialize_redaction() {
        let key = ApiKey::from("real-secret-value");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
    }

    #[test]
    fn test_credentials_debug_redaction() {
        let config = Config::from_lookup(env_of(&[("ANTHROPIC_API_KEY", "sk-ant-secret")])).unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-ant-secret"));
    }

    #[test]
    fn test_presence_lists_every_variable() {
        let config = Config::from_lookup(env_of(&[("TAVILY_API_KEY", "tvly")])).unwrap();
        let presence = config.credentials.presence();
        assert_eq!(presence.len(), 6);
        assert!(presence.contains(&("TAVILY_API_KEY", true)));
        assert!(presence.contains(&("OPENAI_API_KEY", false)));
    }
}
