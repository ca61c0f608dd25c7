//! Compiling [`Filter`] trees to SQL.
//!
//! Every leaf carries a `json_type` guard so the SQL agrees with
//! [`Filter::matches`] on scalar attributes: substring search only sees
//! strings, numeric comparisons only see numbers, and equality coerces the
//! literal to whichever scalar type the attribute holds. Array attributes are
//! not unwound.

use rusqlite::types::Value;
use venue_query::Filter;

use crate::{
    expr::{
        ops::Junction,
        path::{JsonPath, JsonType},
    },
    traits::Expression,
};

const NUMERIC_TYPES: [&str; 2] = ["integer", "real"];

impl Expression for Filter {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        compile(self).to_sql(params)
    }
}

fn compile(filter: &Filter) -> Box<dyn Expression> {
    match filter {
        Filter::All => Box::new(Junction::all(vec![])),
        Filter::And(filters) => Box::new(Junction::all(filters.iter().map(compile).collect())),
        Filter::Or(filters) => Box::new(Junction::any(filters.iter().map(compile).collect())),
        Filter::Contains { field, needle } => Box::new(
            JsonType::new(field)
                .eq("text".to_string())
                .and(JsonPath::new(field).icontains(needle.as_str())),
        ),
        Filter::Eq { field, value } => literals(field, std::slice::from_ref(value)),
        Filter::In { field, values } => literals(field, values),
        Filter::Compare { field, op, value } => Box::new(
            JsonType::new(field)
                .in_(NUMERIC_TYPES.map(String::from))
                .and(JsonPath::new(field).compare(op.symbol(), *value)),
        ),
    }
}

/// Equality with any of `values`, each taken as text and, where it parses,
/// as a number or a boolean.
fn literals(field: &str, values: &[String]) -> Box<dyn Expression> {
    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect();
    let booleans: Vec<String> = values
        .iter()
        .filter_map(|v| v.parse::<bool>().ok())
        .map(|b| b.to_string())
        .collect();

    let mut branches: Vec<Box<dyn Expression>> = vec![Box::new(
        JsonType::new(field)
            .eq("text".to_string())
            .and(JsonPath::new(field).in_(values.to_vec())),
    )];
    if !numbers.is_empty() {
        branches.push(Box::new(
            JsonType::new(field)
                .in_(NUMERIC_TYPES.map(String::from))
                .and(JsonPath::new(field).in_(numbers)),
        ));
    }
    if !booleans.is_empty() {
        branches.push(Box::new(JsonType::new(field).in_(booleans)));
    }

    Box::new(Junction::any(branches))
}

#[cfg(test)]
mod tests {
    use venue_query::CmpOp;

    use super::*;

    fn sql(filter: &Filter) -> (String, Vec<Value>) {
        let mut params = vec![];
        let sql = filter.to_sql(&mut params);
        (sql, params)
    }

    #[test]
    fn test_all_is_true() {
        assert_eq!(sql(&Filter::All), ("1".to_string(), vec![]));
        assert_eq!(sql(&Filter::Or(vec![])).0, "0");
    }

    #[test]
    fn test_contains_is_guarded_and_bound() {
        let (sql, params) = sql(&Filter::contains("name", "o'brien"));

        assert_eq!(
            sql,
            "(json_type(doc, ?) = ? AND unicode_lower(json_extract(doc, ?)) LIKE unicode_lower(?) ESCAPE '\\')"
        );
        assert_eq!(
            params,
            vec![
                Value::Text(r#"$."name""#.into()),
                Value::Text("text".into()),
                Value::Text(r#"$."name""#.into()),
                Value::Text("%o'brien%".into()),
            ]
        );
    }

    #[test]
    fn test_compare_binds_real() {
        let (sql, params) = sql(&Filter::compare("rating", CmpOp::Gte, 4.0));

        assert_eq!(
            sql,
            "(json_type(doc, ?) IN (?, ?) AND json_extract(doc, ?) >= ?)"
        );
        assert_eq!(params.last(), Some(&Value::Real(4.0)));
    }

    #[test]
    fn test_eq_adds_numeric_and_boolean_branches() {
        let (text_only, _) = sql(&Filter::eq("city", "Leeds"));
        assert!(!text_only.contains(" OR "));

        let (numeric, params) = sql(&Filter::eq("stars", "3"));
        assert!(numeric.contains(" OR "));
        assert!(params.contains(&Value::Real(3.0)));

        let (boolean, params) = sql(&Filter::eq("open", "true"));
        assert!(boolean.contains(" OR "));
        assert!(params.contains(&Value::Text("true".into())));
    }

    #[test]
    fn test_and_joins_children() {
        let filter = Filter::eq("a", "x").and(Filter::contains("b", "y"));
        let (sql, _) = sql(&filter);

        assert!(sql.starts_with('('));
        assert!(sql.contains(") AND ("));
    }
}
