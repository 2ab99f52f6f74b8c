//! Chat request body coercion.

use serde_json::{Map, Value};

/// A chat request, coerced from a loosely typed body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatInput {
    pub prompt: String,
    pub model: Option<String>,
    /// Gather web sources first; `None` defers to configuration
    pub search: Option<bool>,
    pub max_results: Option<usize>,
}

impl ChatInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Coerce a raw request body.
    ///
    /// - JSON object: `prompt`, else `input`, else empty; plus the optional
    ///   `model`, `search` and `max_results` fields when correctly typed.
    /// - JSON string: the prompt itself.
    /// - Any other JSON value: empty prompt.
    /// - Not JSON: the body text is the prompt.
    pub fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields),
            Ok(Value::String(prompt)) => Self::new(prompt),
            Ok(_) => Self::default(),
            Err(_) => Self::new(String::from_utf8_lossy(body).into_owned()),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let prompt = fields
            .get("prompt")
            .and_then(Value::as_str)
            .or_else(|| fields.get("input").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        Self {
            prompt,
            model: fields
                .get("model")
                .and_then(Value::as_str)
                .map(str::to_string),
            search: fields.get("search").and_then(Value::as_bool),
            max_results: fields
                .get("max_results")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_with_prompt() {
        let input = ChatInput::from_body(br#"{"prompt":"What is Rust?","model":"claude-3-haiku"}"#);
        assert_eq!(input.prompt, "What is Rust?");
        assert_eq!(input.model.as_deref(), Some("claude-3-haiku"));
        assert_eq!(input.search, None);
    }

    #[test]
    fn input_field_is_the_fallback() {
        let input = ChatInput::from_body(br#"{"input":"fallback prompt"}"#);
        assert_eq!(input.prompt, "fallback prompt");

        let input = ChatInput::from_body(br#"{"prompt":"wins","input":"loses"}"#);
        assert_eq!(input.prompt, "wins");
    }

    #[test]
    fn object_without_prompt_is_empty() {
        let input = ChatInput::from_body(br#"{"model":"gpt-4o"}"#);
        assert_eq!(input.prompt, "");
        assert_eq!(input.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn string_body_is_the_prompt() {
        let input = ChatInput::from_body(br#""just a string""#);
        assert_eq!(input, ChatInput::new("just a string"));
    }

    #[test]
    fn raw_text_body_is_the_prompt() {
        let input = ChatInput::from_body(b"tell me about climate change");
        assert_eq!(input.prompt, "tell me about climate change");
        assert!(input.model.is_none());
    }

    #[test]
    fn empty_and_non_object_bodies() {
        assert_eq!(ChatInput::from_body(b""), ChatInput::default());
        assert_eq!(ChatInput::from_body(b"  \n"), ChatInput::default());
        assert_eq!(ChatInput::from_body(b"42"), ChatInput::default());
        assert_eq!(ChatInput::from_body(b"[1,2]"), ChatInput::default());
    }

    #[test]
    fn mistyped_fields_are_ignored() {
        let input = ChatInput::from_body(
            br#"{"prompt":"q","model":7,"search":"yes","max_results":-1}"#,
        );
        assert_eq!(input.prompt, "q");
        assert!(input.model.is_none());
        assert!(input.search.is_none());
        assert!(input.max_results.is_none());
    }

    #[test]
    fn search_options() {
        let input = ChatInput::from_body(br#"{"prompt":"q","search":true,"max_results":3}"#);
        assert_eq!(input.search, Some(true));
        assert_eq!(input.max_results, Some(3));
    }
}
