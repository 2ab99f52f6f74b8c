//! Router module for model selection.
//!
//! Resolves a requested model name to a backend based on:
//! - Name prefix (`claude*`, `hf-*`, anything else is OpenAI)
//! - Deployment environment
//! - Which credentials and base URL overrides are configured

mod selector;

pub use selector::{
    ModelRouter, ModelSelection, OpenAiMode, ProviderIdentity, DEFAULT_HOSTED_MODEL,
    DEFAULT_LOCAL_MODEL,
};
