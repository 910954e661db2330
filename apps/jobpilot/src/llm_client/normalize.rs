//! Output normalizer: turns free-form model text into a validated JSON value.
//!
//! Model output is treated like an untrusted wire message: fences are stripped,
//! the body is parsed, and any failure comes back as an `AnalysisParseError`
//! carrying the exact text that was received.

use serde::de::DeserializeOwned;
use thiserror::Error;

const FENCE: &str = "```";

/// The model's text could not be interpreted as the expected structure.
#[derive(Debug, Clone, Error)]
#[error("could not parse model output: {reason}")]
pub struct AnalysisParseError {
    /// Byte-for-byte the text handed to the normalizer.
    pub raw: String,
    pub reason: String,
}

/// Parses model text as `T`, tolerating a surrounding markdown code fence.
pub fn normalize<T: DeserializeOwned>(text: &str) -> Result<T, AnalysisParseError> {
    let body = strip_json_fences(text);
    serde_json::from_str(body).map_err(|e| AnalysisParseError {
        raw: text.to_string(),
        reason: e.to_string(),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
///
/// A language tag is only recognised when it is immediately followed by
/// whitespace, so a one-line fence like ```true``` keeps its body.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(after_fence) = text.strip_prefix(FENCE) else {
        return text;
    };

    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+'))
        .unwrap_or(after_fence.len());
    let after_tag = &after_fence[tag_len..];
    let body = if tag_len > 0 && after_tag.starts_with(char::is_whitespace) {
        after_tag
    } else {
        after_fence
    };

    let body = body.trim();
    body.strip_suffix(FENCE).map(str::trim).unwrap_or(body)
}
