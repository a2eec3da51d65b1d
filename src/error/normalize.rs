//! Collapse heterogeneous error payloads into one human-readable message.
//!
//! Engine failures arrive as plain strings, error objects with a `message`,
//! or `{ "error": { ... } }` wrappers nested to arbitrary depth. The most
//! specific non-junk message wins; placeholder strings such as
//! `undefined (undefined)` are never surfaced.

use serde_json::Value;

/// Fallback used when no meaningful message can be found.
pub const GENERIC_EXECUTION_ERROR: &str = "Workflow execution failed";

const MAX_NESTING: usize = 16;

/// Normalise a JSON error payload.
pub fn normalize_error_value(value: &Value) -> String {
    most_specific(value, 0).unwrap_or_else(|| GENERIC_EXECUTION_ERROR.to_string())
}

/// Normalise a raw message string.
pub fn normalize_error_message(raw: &str) -> String {
    clean(raw).unwrap_or_else(|| GENERIC_EXECUTION_ERROR.to_string())
}

/// Normalise a native error, walking its source chain when the top-level
/// message is junk.
pub fn normalize_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(message) = clean(&e.to_string()) {
            return message;
        }
        current = e.source();
    }
    GENERIC_EXECUTION_ERROR.to_string()
}

fn most_specific(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_NESTING {
        return None;
    }
    match value {
        Value::String(s) => clean(s),
        Value::Object(map) => {
            if let Some(nested) = map.get("error") {
                if let Some(message) = most_specific(nested, depth + 1) {
                    return Some(message);
                }
            }
            map.get("message")
                .and_then(|m| most_specific(m, depth + 1))
                .or_else(|| map.get("details").and_then(|d| most_specific(d, depth + 1)))
        }
        _ => None,
    }
}

fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_junk(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_junk(message: &str) -> bool {
    if message.is_empty() {
        return true;
    }
    message
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ':' | ','))
        .filter(|token| !token.is_empty())
        .all(|token| {
            matches!(
                token,
                "undefined" | "null" | "None" | "[object" | "Object]" | "Error"
            )
        })
}
