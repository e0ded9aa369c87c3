//! Parsing helpers for structured model output.
//!
//! Models asked for JSON still wrap it in code fences or surrounding prose
//! often enough that every structured call goes through these helpers instead
//! of deserializing the raw response.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{BadgerError, BadgerResult};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

/// Extract the JSON object from a model response.
///
/// Tries a fenced code block first, then falls back to the outermost brace
/// pair. Fails when the response contains no object at all.
pub fn extract_json(response: &str) -> BadgerResult<String> {
    let trimmed = response.trim();

    if let Some(captures) = CODE_BLOCK_RE.captures(trimmed) {
        if let Some(inner) = captures.get(1) {
            return Ok(inner.as_str().trim().to_string());
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(trimmed[start..=end].to_string()),
        _ => Err(BadgerError::parse("no JSON object in model response")),
    }
}

/// Extract and deserialize the JSON object from a model response.
pub fn parse_json<T: DeserializeOwned>(response: &str) -> BadgerResult<T> {
    let json = extract_json(response)?;
    serde_json::from_str(&json)
        .map_err(|e| BadgerError::parse(format!("model JSON did not match schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        value: i32,
    }

    #[test]
    fn test_plain_object() {
        let parsed: Sample = parse_json(r#"{"value": 7}"#).unwrap();
        assert_eq!(parsed, Sample { value: 7 });
    }

    #[test]
    fn test_fenced_object() {
        let response = "```json\n{\"value\": 7}\n```";
        let parsed: Sample = parse_json(response).unwrap();
        assert_eq!(parsed.value, 7);
    }

    #[test]
    fn test_object_with_surrounding_prose() {
        let response = "Here is the result: {\"value\": 3} hope that helps";
        let parsed: Sample = parse_json(response).unwrap();
        assert_eq!(parsed.value, 3);
    }

    #[test]
    fn test_no_object_is_error() {
        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn test_schema_mismatch_is_error() {
        let result: BadgerResult<Sample> = parse_json(r#"{"other": true}"#);
        assert!(result.is_err());
    }
}
