//! Provider subsystem for chat-completion backends.
//!
//! Each provider implements the [`Provider`] trait defined in [`traits`] and is
//! registered in the factory function [`create_provider`] by its canonical
//! string key.

pub mod compatible;
pub mod traits;

pub use compatible::OpenAiCompatibleProvider;
pub use traits::{
    ChatMessage, ChatRequest, ChatResponse, ConversationMessage, Provider, ToolCall,
    ToolResultMessage,
};

const MAX_API_ERROR_CHARS: usize = 200;
const SECRET_PREFIXES: [&str; 2] = ["sk-", "org-"];
const REDACTED: &str = "[REDACTED]";

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

/// Earliest secret prefix in `haystack`, with its byte offset.
fn next_secret_prefix(haystack: &str) -> Option<(usize, &'static str)> {
    SECRET_PREFIXES
        .iter()
        .filter_map(|prefix| haystack.find(prefix).map(|at| (at, *prefix)))
        .min_by_key(|(at, _)| *at)
}

/// Replace credential-looking tokens (`sk-…`, `sk-proj-…`, `org-…`) with
/// `[REDACTED]`. A bare prefix with nothing after it is kept.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((at, prefix)) = next_secret_prefix(rest) {
        out.push_str(&rest[..at]);
        let tail = &rest[at + prefix.len()..];
        let token_len = tail.find(|c: char| !is_secret_char(c)).unwrap_or(tail.len());
        out.push_str(if token_len == 0 { prefix } else { REDACTED });
        rest = &tail[token_len..];
    }

    out.push_str(rest);
    out
}

/// Scrub secrets, then cap the text at [`MAX_API_ERROR_CHARS`] characters.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    match scrubbed.char_indices().nth(MAX_API_ERROR_CHARS) {
        Some((cut, _)) => format!("{}...", &scrubbed[..cut]),
        None => scrubbed,
    }
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

/// Factory: create the provider registered under `name`.
///
/// The credential comes from the caller only; a blank key counts as absent.
pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    api_url: &str,
) -> anyhow::Result<Box<dyn Provider>> {
    let key = api_key.map(str::trim).filter(|key| !key.is_empty());

    match name {
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(name, api_url, key))),
        _ => anyhow::bail!("Unknown provider: {name}. Only \"openai\" is currently supported."),
    }
}
