use serde_json::Value;

/// Fields the backend has used for human-readable error text across
/// revisions, in lookup order.
const MESSAGE_FIELDS: [&str; 4] = ["message", "title", "detail", "description"];

/// Extracts the best available error message from a backend error body.
/// Falls back to the serialized body itself so a structured error is never
/// reduced to an empty string.
pub fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(text) = body.as_str() {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
        return None;
    }

    let object = body.as_object()?;
    for field in MESSAGE_FIELDS {
        if let Some(text) = object.get(field).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    if object.is_empty() {
        return None;
    }
    Some(body.to_string())
}
