//! Parsing of the JSON object steps ask the model to answer with.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pulls the JSON object out of a model reply: a ```json fenced block when present, else the
/// span from the first `{` to the last `}`.
pub fn extract_json(content: &str) -> Option<&str> {
    if let Some(start) = content.find("```") {
        let after = &content[start + 3..];
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

/// Decodes the model reply into `T`.
///
/// `Err` carries the message to record in the state's error slot: the model's own `error`
/// field when it set one, otherwise a description of what could not be read.
pub fn parse_output<T: DeserializeOwned>(content: &str, what: &str) -> Result<T, String> {
    let json = extract_json(content).ok_or_else(|| format!("Could not read {}: no JSON object in model output", what))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| format!("Could not read {}: {}", what, e))?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        if !error.trim().is_empty() {
            return Err(error.to_string());
        }
    }
    serde_json::from_value(value).map_err(|e| format!("Could not read {}: {}", what, e))
}
