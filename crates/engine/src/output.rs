//! Structured-output extraction.
//!
//! Agents reason freely and optionally hand off a structured JSON payload at
//! the end of their text, either inside `[STRUCTURED_OUTPUT]` markers or as
//! a bare trailing object. Code fences and `<think>` blocks are stripped
//! first so JSON-looking text inside them is never picked up.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
static OUTPUT_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[STRUCTURED_OUTPUT\](.*?)\[/STRUCTURED_OUTPUT\]").expect("valid regex")
});

/// Extract the trailing JSON object from free-form model text.
///
/// Returns `None` on any failure — no brace, unbalanced braces, or invalid
/// JSON. Malformed output is never an error; the caller just stores the turn
/// without structured data.
pub fn extract_trailing_json(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    let cleaned = CODE_FENCE.replace_all(text, "");
    let cleaned = THINK_BLOCK.replace_all(&cleaned, "");

    // An explicit marker block wins when it parses; otherwise fall through
    // to the trailing-object scan.
    if let Some(captures) = OUTPUT_MARKERS.captures(&cleaned) {
        if let Ok(value) = serde_json::from_str(captures[1].trim()) {
            return Some(value);
        }
    }

    let candidate = trailing_object(&cleaned)?;
    serde_json::from_str(candidate.trim()).ok()
}

/// The last balanced `{...}` block, found by walking backwards from the
/// final `}` until the brace depth returns to zero.
fn trailing_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let end = text.rfind('}')?;

    let mut depth = 0usize;
    for idx in (0..=end).rev() {
        match bytes[idx] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[idx..=end]);
                }
            }
            _ => {}
        }
    }
    None
}
