//! Fixed texts and prompt assembly.

/// System instruction sent with every model call.
pub const SYSTEM_INSTRUCTION: &str = "You are Clark, an elite research assistant and answer engine.
Provide direct, accurate answers with clear reasoning only when necessary.
Always include citations for non-trivial facts using markdown footnotes [^1] linked to URLs.
Prefer primary sources. Aggregate across multiple sources when helpful.";

/// Reply for a production deployment with no model credentials at all.
pub const SETUP_GUIDANCE: &str = r#"I'm Clark, your AI research assistant! 🚀

This is a demo deployment. To get full AI responses, you can:

1. **Set up your own API keys** in the server environment:
   - OPENAI_API_KEY (for GPT models)
   - ANTHROPIC_API_KEY (for Claude models)
   - HUGGINGFACE_API_KEY (for hf- prefixed models)
   - Or OPENAI_BASE_URL (for custom endpoints)

2. **Run locally** with Ollama for free:
   ```bash
   ollama pull mistral
   clark serve
   ```

3. **Try the demo**: Ask me about "What is artificial intelligence?" or "Tell me about climate change"

I'm here to help with research, answer questions, and provide citations when you have the full setup! 📚"#;

/// Plain-text reply for a failed answer.
pub fn error_reply(message: &str) -> String {
    format!(
        "Sorry, I encountered an error: {}. Please check your API configuration.",
        message
    )
}

/// One numbered source appended to the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub title: String,
    pub url: String,
    /// Extracted page text, or the search snippet when extraction failed
    pub text: String,
}

/// Append a numbered source block to `prompt`. No sources, no block.
pub fn with_sources(prompt: &str, sources: &[SourceContext]) -> String {
    if sources.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::with_capacity(prompt.len() + 512);
    out.push_str(prompt);
    out.push_str("\n\nSources:\n");
    for (i, source) in sources.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}\nURL: {}\n", i + 1, source.title, source.url));
        if !source.text.is_empty() {
            out.push_str(&source.text);
            out.push('\n');
        }
    }
    out.push_str("\nCite these sources with footnotes like [^1] linked to their URLs.");
    out
}

/// Truncate to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
