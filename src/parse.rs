//! Validation and parsing of raw model output.
//!
//! The model is asked for a bare JSON object but routinely wraps it in a
//! fenced code block (sometimes tagged `json`). Fence stripping is
//! transparent: unwrapped input passes through unchanged, so stripping is
//! idempotent. Parsing itself is strict JSON; a malformed response is the
//! retry trigger one level up, not something to repair here.

use crate::report::ParsedReport;

/// Why an attempt's output was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty response from LLM")]
    Empty,

    #[error("invalid JSON in LLM response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Strip an optional fenced code block, returning the inner content.
///
/// Matches a ```` ``` ```` or ```` ```json ```` fence with the payload on
/// its own lines. Anything without a complete fence pair comes back
/// trimmed but otherwise untouched.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[open + 3..];
    let after_tag = after_fence.strip_prefix("json").unwrap_or(after_fence);

    // Payload starts after the fence line's newline.
    let Some(newline) = after_tag.find('\n') else {
        return trimmed;
    };
    let inner = &after_tag[newline + 1..];

    match inner.find("```") {
        Some(close) => inner[..close].trim(),
        None => trimmed,
    }
}

/// Validate and parse one attempt's raw output into an untrusted report.
pub fn parse_report(raw: &str) -> Result<ParsedReport, ParseError> {
    let json = strip_code_fence(raw);
    if json.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(serde_json::from_str(json)?)
}
