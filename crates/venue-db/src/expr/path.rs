//! References to attributes of a stored document.
//!
//! Documents live in the `doc` column as JSON text. An attribute is read with
//! `json_extract(doc, ?)`, its JSON type with `json_type(doc, ?)`. The path is
//! always a bound parameter.

use rusqlite::types::Value;

use crate::traits::Expression;

/// Name of the column holding the document.
pub const DOC_COLUMN: &str = "doc";

/// Converts a dotted attribute path into an SQLite JSON path.
///
/// Every segment is quoted, so a segment is always an object key.
///
/// ```rust
/// assert_eq!(venue_db::expr::path::json_path("address.city"), r#"$."address"."city""#);
/// ```
pub fn json_path(field: &str) -> String {
    let mut path = String::from("$");
    for segment in field.split('.') {
        path.push_str(".\"");
        path.push_str(segment);
        path.push('"');
    }
    path
}

/// The value of a document attribute.
#[derive(Debug, Clone)]
pub struct JsonPath {
    path: String,
}

impl JsonPath {
    pub fn new(field: &str) -> Self {
        Self {
            path: json_path(field),
        }
    }
}

impl Expression for JsonPath {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        params.push(Value::Text(self.path.clone()));
        format!("json_extract({DOC_COLUMN}, ?)")
    }
}

/// The JSON type of a document attribute: `null`, `true`, `false`,
/// `integer`, `real`, `text`, `array` or `object`. SQL `NULL` when missing.
#[derive(Debug, Clone)]
pub struct JsonType {
    path: String,
}

impl JsonType {
    pub fn new(field: &str) -> Self {
        Self {
            path: json_path(field),
        }
    }
}

impl Expression for JsonType {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        params.push(Value::Text(self.path.clone()));
        format!("json_type({DOC_COLUMN}, ?)")
    }
}

/// Ranks a document attribute by JSON type for ordering:
/// null or missing, numbers, text, objects, arrays, booleans.
///
/// Sorting by the rank first keeps mixed-type attributes in the same order
/// as [`venue_query::MemoryCollection`]; `json_extract` alone would sort
/// booleans among the numbers.
#[derive(Debug, Clone)]
pub struct TypeRank {
    path: String,
}

impl TypeRank {
    pub fn new(field: &str) -> Self {
        Self {
            path: json_path(field),
        }
    }
}

impl Expression for TypeRank {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        params.push(Value::Text(self.path.clone()));
        format!(
            "CASE COALESCE(json_type({DOC_COLUMN}, ?), 'null') \
             WHEN 'null' THEN 0 WHEN 'integer' THEN 1 WHEN 'real' THEN 1 \
             WHEN 'text' THEN 2 WHEN 'object' THEN 3 WHEN 'array' THEN 4 ELSE 5 END"
        )
    }
}
