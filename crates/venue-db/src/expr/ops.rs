//! SQL expression operators.
//!
//! These structs represent compound expressions like `x = ?`, `x LIKE ?`, etc.
//! Each implements [`Expression`] and recursively builds SQL fragments.

use rusqlite::types::Value;

use crate::{store::LOWER_FUNCTION, traits::Expression};

/// Represents a binary comparison (e.g., `=`, `>`, `<=`).
pub struct BinaryOp<L> {
    left: L,
    op: &'static str,
    right: Value,
}

impl<L> BinaryOp<L> {
    pub fn new(left: L, op: &'static str, right: Value) -> Self {
        Self { left, op, right }
    }
}

impl<L: Expression> Expression for BinaryOp<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let left_sql = self.left.to_sql(params);
        params.push(self.right.clone());
        format!("{} {} ?", left_sql, self.op)
    }
}

/// Represents a case-insensitive substring match with `LIKE`.
///
/// Both sides are folded with [`LOWER_FUNCTION`], which lowercases the full
/// Unicode range. The needle is escaped so `%`, `_` and `\` match themselves.
pub struct LikeOp<L> {
    left: L,
    needle: String,
}

impl<L> LikeOp<L> {
    pub const fn new(left: L, needle: String) -> Self {
        Self { left, needle }
    }
}

/// Escapes `LIKE` wildcards with `\`.
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl<L: Expression> Expression for LikeOp<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let left_sql = self.left.to_sql(params);
        params.push(Value::Text(format!("%{}%", escape_like(&self.needle))));
        format!(
            "{LOWER_FUNCTION}({}) LIKE {LOWER_FUNCTION}(?) ESCAPE '\\'",
            left_sql
        )
    }
}

/// Represents an `IN` clause. An empty list is always false.
pub struct InOp<L> {
    left: L,
    values: Vec<Value>,
}

impl<L> InOp<L> {
    pub fn new(left: L, values: Vec<Value>) -> Self {
        Self { left, values }
    }
}

impl<L: Expression> Expression for InOp<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        if self.values.is_empty() {
            return "0".to_string();
        }
        let left_sql = self.left.to_sql(params);
        let placeholders = vec!["?"; self.values.len()].join(", ");
        params.extend(self.values.iter().cloned());
        format!("{} IN ({})", left_sql, placeholders)
    }
}

/// Combines two expressions with `AND` or `OR`.
pub struct LogicalOp<L, R> {
    left: L,
    right: R,
    op: &'static str,
}

impl<L, R> LogicalOp<L, R> {
    pub fn new(left: L, right: R, op: &'static str) -> Self {
        Self { left, right, op }
    }
}

impl<L: Expression, R: Expression> Expression for LogicalOp<L, R> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let left_sql = self.left.to_sql(params);
        let right_sql = self.right.to_sql(params);
        format!("({} {} {})", left_sql, self.op, right_sql)
    }
}

/// Joins any number of boxed expressions with `AND` or `OR`.
///
/// An empty conjunction is true, an empty disjunction false.
pub struct Junction {
    parts: Vec<Box<dyn Expression>>,
    op: &'static str,
}

impl Junction {
    pub fn all(parts: Vec<Box<dyn Expression>>) -> Self {
        Self { parts, op: "AND" }
    }

    pub fn any(parts: Vec<Box<dyn Expression>>) -> Self {
        Self { parts, op: "OR" }
    }
}

impl Expression for Junction {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self.parts.as_slice() {
            [] if self.op == "AND" => "1".to_string(),
            [] => "0".to_string(),
            [only] => only.to_sql(params),
            parts => {
                let sql = parts
                    .iter()
                    .map(|part| part.to_sql(params))
                    .collect::<Vec<_>>()
                    .join(&format!(" {} ", self.op));
                format!("({})", sql)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{JsonPath, JsonType};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_like_binds_escaped_needle() {
        let mut params = vec![];
        let sql = JsonPath::new("name").icontains("5%").to_sql(&mut params);

        assert_eq!(
            sql,
            "unicode_lower(json_extract(doc, ?)) LIKE unicode_lower(?) ESCAPE '\\'"
        );
        assert_eq!(params[1], Value::Text("%5\\%%".into()));
    }

    #[test]
    fn test_in_and_logical() {
        let mut params = vec![];
        let sql = JsonType::new("tag")
            .eq("text".to_string())
            .and(JsonPath::new("tag").in_(vec!["a".to_string(), "b".to_string()]))
            .to_sql(&mut params);

        assert_eq!(
            sql,
            "(json_type(doc, ?) = ? AND json_extract(doc, ?) IN (?, ?))"
        );
        assert_eq!(params.len(), 5);

        let mut params = vec![];
        let empty: Vec<String> = vec![];
        assert_eq!(JsonPath::new("tag").in_(empty).to_sql(&mut params), "0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_empty_junctions() {
        let mut params = vec![];
        assert_eq!(Junction::all(vec![]).to_sql(&mut params), "1");
        assert_eq!(Junction::any(vec![]).to_sql(&mut params), "0");
    }
}
