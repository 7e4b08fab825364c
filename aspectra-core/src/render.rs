//! Bounded renderings of arguments and results for log records.

use crate::constants::{NULL_RESULT_RENDERING, TRUNCATION_MARKER};
use serde_json::Value;

/// Truncate `text` to at most `max_chars` characters, appending the
/// truncation marker when anything was cut.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Render a result value for logging.
///
/// Strings render without quotes, null renders as `void/null`, everything
/// else renders as compact JSON.
pub fn render_value(value: &Value, max_chars: usize) -> String {
    match value {
        Value::Null => NULL_RESULT_RENDERING.to_string(),
        Value::String(s) => truncate(s, max_chars),
        other => truncate(&other.to_string(), max_chars),
    }
}
