//! JavaScript literal rendering.

use jtrace_core::patch::{char_literal, raw_literal};
use jtrace_core::types;
use jtrace_core::ReturnPatchRule;

/// Quotes `value` as a JavaScript string literal.
///
/// JSON string syntax is valid JavaScript except for the two line
/// separators JSON leaves raw, which older engines reject in literals.
pub fn js_quote(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

/// Flattens `text` onto one line so it cannot end a `//` comment.
pub fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n', '\u{2028}', '\u{2029}'], " ")
}

/// Renders the CONSTANT payload of `rule` for a method returning `return_type`.
///
/// - empty or `null` renders `null`
/// - `js:` / `raw:` payloads are emitted verbatim
/// - `boolean` is lowercased, numeric types pass through
/// - `char` accepts a single character (optionally quoted) as its code point
/// - everything else becomes a quoted string
pub fn constant_literal(rule: &ReturnPatchRule, return_type: &str) -> String {
    let trimmed = rule.constant_value.trim();
    if trimmed.is_empty() {
        return "null".to_string();
    }
    if let Some(raw) = raw_literal(trimmed) {
        return raw.to_string();
    }
    if trimmed == "null" {
        return "null".to_string();
    }
    if types::is_boolean(return_type) {
        return trimmed.to_lowercase();
    }
    if types::is_numeric(return_type) {
        if return_type == "char" {
            if let Some(c) = char_literal(trimmed) {
                return u32::from(c).to_string();
            }
        }
        return trimmed.to_string();
    }
    js_quote(trimmed)
}
