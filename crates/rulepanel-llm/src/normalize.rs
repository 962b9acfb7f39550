//! Reply normalization: heterogeneous provider payloads to plain text.
//!
//! Strategies run in order and the first one that yields non-blank text wins:
//!
//! 1. bare JSON string
//! 2. top-level `content` / `text` / `output` / `result`
//! 3. `choices[0]` (`text`, `content`, `message.content`)
//! 4. `generations[0][0]` or `generations[0]` (`text`, `message.content`)
//! 5. `content` as an array of blocks with `text`
//!
//! If nothing matches, the compact JSON rendering is returned, so
//! [`normalize_reply`] is total.

use serde_json::Value;

const TEXT_KEYS: [&str; 4] = ["content", "text", "output", "result"];

type Strategy = fn(&Value) -> Option<String>;

const STRATEGIES: [Strategy; 5] = [
    bare_string,
    top_level_field,
    first_choice,
    first_generation,
    content_blocks,
];

/// Extract text using the ordered strategies, without the stringify fallback.
pub fn extract_text(value: &Value) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(value))
}

/// Normalize any provider payload to a `String`.
pub fn normalize_reply(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    extract_text(value).unwrap_or_else(|| value.to_string())
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn bare_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn top_level_field(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    TEXT_KEYS.iter().find_map(|key| non_blank(obj.get(*key)))
}

fn text_or_message(item: &Value) -> Option<String> {
    non_blank(item.get("text"))
        .or_else(|| non_blank(item.get("content")))
        .or_else(|| non_blank(item.pointer("/message/content")))
}

fn first_choice(value: &Value) -> Option<String> {
    let choice = value.get("choices")?.as_array()?.first()?;
    text_or_message(choice)
}

fn first_generation(value: &Value) -> Option<String> {
    let first = value.get("generations")?.as_array()?.first()?;
    let candidate = match first {
        Value::Array(inner) => inner.first()?,
        other => other,
    };
    non_blank(candidate.get("text")).or_else(|| non_blank(candidate.pointer("/message/content")))
}

fn content_blocks(value: &Value) -> Option<String> {
    let blocks = value.get("content")?.as_array()?;
    let joined: String = blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    (!joined.trim().is_empty()).then_some(joined)
}
