//! Canonical JSON rendering for structured attribute values.
//!
//! Object keys are emitted in sorted order regardless of how the value was
//! built, so two semantically equal values always produce the same text.
//! Callers rely on this when comparing stored elements for duplicates.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serializes any value to canonical JSON text.
pub(crate) fn to_canonical<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(canonical_text(&value))
}

/// Renders an already built JSON value as canonical text.
pub(crate) fn canonical_text(value: &Value) -> String {
    sorted(value).to_string()
}

/// Parses JSON text into a dynamic value.
pub(crate) fn parse_value(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(text)
}

/// Parses JSON text into a typed value.
pub(crate) fn parse<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    serde_json::from_str(text)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::with_capacity(entries.len());
            for (key, item) in entries {
                out.insert(key.clone(), sorted(item));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn keys_are_sorted() {
        let text = canonical_text(&json!({"b": 1, "a": {"d": 2, "c": 3}}));
        assert_eq!(text, r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn equal_maps_serialize_identically() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("k{i}"), i);
        }
        for i in (0..32).rev() {
            second.insert(format!("k{i}"), i);
        }
        assert_eq!(to_canonical(&first).unwrap(), to_canonical(&second).unwrap());
    }

    #[test]
    fn compact_output() {
        assert_eq!(canonical_text(&json!([1, "a", null])), r#"[1,"a",null]"#);
    }
}
