//! Extract a human-readable message from a provider error body
//!
//! The accounts service answers with the OAuth shape
//! `{"error":"invalid_grant","error_description":"..."}` while the Web API
//! uses `{"error":{"status":401,"message":"..."}}`. Only those fields are
//! surfaced; an unrecognised body yields `None` and the caller falls back to
//! the status line, so nothing echoed back by the provider leaks verbatim.

use serde_json::Value;

pub fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let description = value.get("error_description").and_then(Value::as_str);

    match (value.get("error")?, description) {
        (Value::String(code), Some(description)) => Some(format!("{code}: {description}")),
        (Value::String(code), None) => Some(code.clone()),
        (Value::Object(object), _) => object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
