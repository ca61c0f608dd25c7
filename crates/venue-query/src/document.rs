//! Helpers for working with JSON documents.
//!
//! Documents are plain `serde_json::Value` objects. Attributes are addressed
//! by dot-separated paths (`address.city`).

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

static NULL: Value = Value::Null;

/// Resolves a dot-separated attribute path on a document.
///
/// Returns `Value::Null` if any segment is missing.
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> &'a Value {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) => current = v,
            None => return &NULL,
        }
    }
    current
}

/// Copies the attribute at `path` from `src` into `dst`, creating
/// intermediate objects as needed. Missing attributes are skipped.
pub(crate) fn copy_path(src: &Map<String, Value>, dst: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = src.get(path) {
                dst.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(inner)) = src.get(head) else {
                return;
            };
            let entry = dst
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(target) = entry {
                copy_path(inner, target, rest);
            }
        }
    }
}

/// Removes the attribute at `path` from `map`, if present.
pub(crate) fn remove_path(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = map.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// Orders two attribute values the way a document database sorts them:
/// null (or missing) < numbers < strings < objects < arrays < booleans.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    };

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Converts a parsed number into a JSON number, keeping integral values
/// as integers so rendered documents read `3` rather than `3.0`.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
