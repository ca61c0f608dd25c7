//! Filter predicates.
//!
//! A [`Filter`] is a small predicate tree over document attributes. It can be
//! evaluated directly against JSON documents ([`Filter::matches`]) or rendered
//! as a document-database filter ([`Filter::to_document`]). Other executors
//! compile it into their own query language.

use std::cmp::Ordering;

use serde_json::{json, Map, Value};

use crate::document::{number_value, resolve_path};

/// Numeric comparison operators accepted in `<op>:<number>` filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
}

impl CmpOp {
    /// Parses the operator token used in request parameters (`gte`, `gt`, ...).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "gte" => Some(Self::Gte),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "lt" => Some(Self::Lt),
            "eq" => Some(Self::Eq),
            _ => None,
        }
    }

    /// The request token for this operator.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Lt => "lt",
            Self::Eq => "eq",
        }
    }

    /// The document-database operator name (`$gte`, ...).
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Gte => "$gte",
            Self::Gt => "$gt",
            Self::Lte => "$lte",
            Self::Lt => "$lt",
            Self::Eq => "$eq",
        }
    }

    /// The SQL comparison symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gte => ">=",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Lt => "<",
            Self::Eq => "=",
        }
    }

    /// Whether `lhs <op> rhs` holds.
    pub fn test(self, lhs: f64, rhs: f64) -> bool {
        let Some(ord) = lhs.partial_cmp(&rhs) else {
            return false;
        };
        match self {
            Self::Gte => ord != Ordering::Less,
            Self::Gt => ord == Ordering::Greater,
            Self::Lte => ord != Ordering::Greater,
            Self::Lt => ord == Ordering::Less,
            Self::Eq => ord == Ordering::Equal,
        }
    }
}

/// A predicate over document attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    And(Vec<Filter>),
    /// Matches if any branch matches. An empty `Or` matches nothing.
    Or(Vec<Filter>),
    /// Case-insensitive substring match on a string attribute.
    Contains { field: String, needle: String },
    /// Equality with a literal taken verbatim from the request.
    Eq { field: String, value: String },
    /// Equality with any of several literals.
    In { field: String, values: Vec<String> },
    /// Numeric comparison.
    Compare { field: String, op: CmpOp, value: f64 },
}

impl Filter {
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn in_<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn compare(field: impl Into<String>, op: CmpOp, value: f64) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Combines two filters with AND, flattening nested conjunctions and
    /// dropping `All`.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    /// Combines filters with OR. A single branch is returned unwrapped.
    pub fn any(mut filters: Vec<Filter>) -> Filter {
        if filters.len() == 1 {
            return filters.remove(0);
        }
        Filter::Or(filters)
    }

    /// Whether this filter matches every document.
    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Evaluates the filter against a document.
    ///
    /// Array attributes match when any element matches. `Eq` and `In`
    /// coerce the literal to the attribute's scalar type, so `"3"` matches
    /// the number `3` and `"true"` matches the boolean `true`.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Filter::Contains { field, needle } => {
                let needle = needle.to_lowercase();
                any_element(resolve_path(doc, field), |v| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            }
            Filter::Eq { field, value } => {
                any_element(resolve_path(doc, field), |v| literal_matches(v, value))
            }
            Filter::In { field, values } => any_element(resolve_path(doc, field), |v| {
                values.iter().any(|lit| literal_matches(v, lit))
            }),
            Filter::Compare { field, op, value } => {
                any_element(resolve_path(doc, field), |v| {
                    v.as_f64().is_some_and(|n| op.test(n, *value))
                })
            }
        }
    }

    /// Renders the filter as a document-database filter document.
    ///
    /// Search needles are escaped, so user text is never interpreted as a
    /// regular expression.
    pub fn to_document(&self) -> Value {
        match self {
            Filter::All => json!({}),
            Filter::And(filters) => {
                json!({ "$and": filters.iter().map(Filter::to_document).collect::<Vec<_>>() })
            }
            Filter::Or(filters) if filters.is_empty() => json!({ "$nor": [{}] }),
            Filter::Or(filters) => {
                json!({ "$or": filters.iter().map(Filter::to_document).collect::<Vec<_>>() })
            }
            Filter::Contains { field, needle } => field_document(
                field,
                json!({ "$regex": regex::escape(needle), "$options": "i" }),
            ),
            Filter::Eq { field, value } => field_document(field, Value::from(value.as_str())),
            Filter::In { field, values } => field_document(field, json!({ "$in": values })),
            Filter::Compare { field, op, value } => {
                let mut cmp = Map::new();
                cmp.insert(op.operator().to_string(), number_value(*value));
                field_document(field, Value::Object(cmp))
            }
        }
    }
}

fn field_document(field: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    Value::Object(map)
}

fn any_element(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

fn literal_matches(value: &Value, literal: &str) -> bool {
    match value {
        Value::String(s) => s == literal,
        Value::Number(n) => match (n.as_f64(), literal.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => literal.parse::<bool>().is_ok_and(|lit| lit == *b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmp_op_tokens() {
        for op in [CmpOp::Gte, CmpOp::Gt, CmpOp::Lte, CmpOp::Lt, CmpOp::Eq] {
            assert_eq!(CmpOp::parse(op.token()), Some(op));
        }
        assert_eq!(CmpOp::parse("ne"), None);
        assert_eq!(CmpOp::parse("GTE"), None);
    }

    #[test]
    fn test_cmp_op_semantics() {
        assert!(CmpOp::Gte.test(10.0, 10.0));
        assert!(!CmpOp::Gt.test(10.0, 10.0));
        assert!(CmpOp::Lte.test(3.0, 4.0));
        assert!(CmpOp::Lt.test(3.0, 4.0));
        assert!(CmpOp::Eq.test(4.0, 4.0));
        assert!(!CmpOp::Eq.test(f64::NAN, f64::NAN));
    }

    #[test]
    fn test_contains_is_case_insensitive_or() {
        let filter = Filter::any(vec![
            Filter::contains("title", "foo"),
            Filter::contains("body", "foo"),
        ]);

        assert!(filter.matches(&json!({"title": "FooBar"})));
        assert!(filter.matches(&json!({"title": "x", "body": "a fOo b"})));
        assert!(!filter.matches(&json!({"title": "bar", "body": "baz"})));
        assert!(!filter.matches(&json!({"title": 42})));
    }

    #[test]
    fn test_eq_coerces_literal() {
        assert!(Filter::eq("city", "Leeds").matches(&json!({"city": "Leeds"})));
        assert!(!Filter::eq("city", "leeds").matches(&json!({"city": "Leeds"})));
        assert!(Filter::eq("stars", "3").matches(&json!({"stars": 3})));
        assert!(Filter::eq("open", "true").matches(&json!({"open": true})));
        assert!(!Filter::eq("open", "true").matches(&json!({})));
    }

    #[test]
    fn test_array_attributes_match_any_element() {
        let doc = json!({"tags": ["Coffee", "quiet"], "scores": [1, 5]});

        assert!(Filter::eq("tags", "quiet").matches(&doc));
        assert!(Filter::contains("tags", "coff").matches(&doc));
        assert!(Filter::compare("scores", CmpOp::Gte, 5.0).matches(&doc));
        assert!(Filter::in_("tags", ["tea", "quiet"]).matches(&doc));
    }

    #[test]
    fn test_compare_only_matches_numbers() {
        let filter = Filter::compare("category", CmpOp::Gte, 3.0);

        assert!(filter.matches(&json!({"category": 3})));
        assert!(filter.matches(&json!({"category": 4.5})));
        assert!(!filter.matches(&json!({"category": 2})));
        assert!(!filter.matches(&json!({"category": "5"})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn test_and_flattens_and_drops_all() {
        let a = Filter::eq("a", "1");
        let b = Filter::eq("b", "2");
        let c = Filter::eq("c", "3");

        assert_eq!(Filter::All.and(a.clone()), a);
        assert_eq!(a.clone().and(Filter::All), a);
        assert_eq!(
            a.clone().and(b.clone()).and(c.clone()),
            Filter::And(vec![a.clone(), b.clone(), c.clone()])
        );
        assert_eq!(
            a.clone().and(Filter::And(vec![b.clone(), c.clone()])),
            Filter::And(vec![a, b, c])
        );
    }

    #[test]
    fn test_empty_or_matches_nothing() {
        let filter = Filter::Or(vec![]);

        assert!(!filter.matches(&json!({"name": "anything"})));
        assert_eq!(filter.to_document(), json!({"$nor": [{}]}));
    }

    #[test]
    fn test_to_document() {
        let filter = Filter::any(vec![
            Filter::contains("name", "a.b"),
            Filter::contains("address", "pub"),
        ])
        .and(Filter::compare("category", CmpOp::Gte, 3.0))
        .and(Filter::in_("tag", ["x", "y"]));

        assert_eq!(
            filter.to_document(),
            json!({"$and": [
                {"$or": [
                    {"name": {"$regex": "a\\.b", "$options": "i"}},
                    {"address": {"$regex": "pub", "$options": "i"}}
                ]},
                {"category": {"$gte": 3}},
                {"tag": {"$in": ["x", "y"]}}
            ]})
        );
        assert_eq!(Filter::All.to_document(), json!({}));
    }
}
