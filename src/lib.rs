//! clark - research-answering orchestrator
//!
//! This library provides the core functionality for the clark service:
//! model selection, web search with fallback, readable page extraction and
//! the streamed answer pipeline that composes them.

pub mod answer;
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod router;
pub mod search;

pub use config::Config;
pub use error::{Error, Result};
