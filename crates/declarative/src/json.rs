//! JSON string normalization
//!
//! JSON-typed attributes are stored in canonical form: sorted keys and no
//! insignificant whitespace. Comparing canonical strings is then the same as
//! comparing the documents structurally.

use crate::value::Value;
use serde_json::Value as Json;

/// Parse and re-serialize a JSON document into canonical form
pub fn normalize(input: &str) -> Result<String, serde_json::Error> {
    let parsed: Json = serde_json::from_str(input)?;
    Ok(canonical(&parsed))
}

/// Canonical serialization of an already parsed document
///
/// `serde_json::Map` keeps keys sorted, so plain serialization is canonical.
pub fn canonical(value: &Json) -> String {
    value.to_string()
}

/// Normalize a JSON attribute, leaving null and unknown untouched
pub fn json_string(value: &Value<String>) -> Result<Value<String>, serde_json::Error> {
    match value {
        Value::Known(raw) => normalize(raw).map(Value::Known),
        Value::Null => Ok(Value::Null),
        Value::Unknown => Ok(Value::Unknown),
    }
}

/// Structural equality of two JSON strings; falls back to text equality
/// when either side does not parse
pub fn equivalent(a: &str, b: &str) -> bool {
    match (normalize(a), normalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Canonical string form of a server-returned JSON scalar or document
///
/// The API returns some JSON fields as embedded strings and others as raw
/// objects; both end up as the same canonical string.
pub fn from_api(value: Option<&Json>) -> Result<Value<String>, serde_json::Error> {
    match value {
        None | Some(Json::Null) => Ok(Value::Null),
        Some(Json::String(raw)) => normalize(raw).map(Value::Known),
        Some(other) => Ok(Value::Known(canonical(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_keys_and_strips_whitespace() {
        let out = normalize("{ \"b\": 1,\n  \"a\": [1, 2] }").unwrap();
        assert_eq!(out, r#"{"a":[1,2],"b":1}"#);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(r#"{"z": {"y": true, "x": null}}"#).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert!(normalize("{not json").is_err());
    }

    #[test]
    fn test_json_string_passes_null_and_unknown() {
        assert!(json_string(&Value::Null).unwrap().is_null());
        assert!(json_string(&Value::Unknown).unwrap().is_unknown());
    }

    #[test]
    fn test_equivalent() {
        assert!(equivalent(r#"{"a":1,"b":2}"#, r#"{ "b": 2, "a": 1 }"#));
        assert!(!equivalent(r#"{"a":1}"#, r#"{"a":2}"#));
    }

    #[test]
    fn test_from_api_accepts_embedded_and_raw() {
        let embedded = serde_json::json!("{\"k\": \"v\"}");
        let raw = serde_json::json!({"k": "v"});
        assert_eq!(
            from_api(Some(&embedded)).unwrap(),
            from_api(Some(&raw)).unwrap()
        );
        assert!(from_api(None).unwrap().is_null());
    }
}
