//! The trait that powers SQL generation.

use rusqlite::types::Value;

use crate::expr::ops::{BinaryOp, InOp, LikeOp, LogicalOp};

/// A type that can be rendered as a SQL expression.
///
/// Implementors include:
/// - [`crate::expr::JsonPath`] and [`crate::expr::JsonType`]: an attribute of
///   the stored document
/// - [`BinaryOp`], [`LikeOp`], etc.: compound expressions
/// - [`venue_query::Filter`]: a whole predicate tree
///
/// When `to_sql` is called, it appends bound parameters to the provided
/// `params` vector and returns the SQL fragment (with `?` placeholders).
/// Nothing taken from a request is ever spliced into the SQL text.
pub trait Expression {
    /// Converts this expression into a SQL string fragment and appends bound parameters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use venue_db::expr::JsonPath;
    /// use venue_db::traits::Expression as _;
    ///
    /// let mut params = vec![];
    /// let sql = JsonPath::new("address.city").eq("Leeds".to_string()).to_sql(&mut params);
    ///
    /// assert_eq!(sql, "json_extract(doc, ?) = ?");
    /// assert_eq!(params.len(), 2);
    /// ```
    fn to_sql(&self, params: &mut Vec<Value>) -> String;

    /// Creates a SQL `=` condition.
    fn eq<T: Into<Value>>(self, value: T) -> BinaryOp<Self>
    where
        Self: Sized,
    {
        BinaryOp::new(self, "=", value.into())
    }

    /// Creates a comparison with an arbitrary SQL operator symbol.
    fn compare<T: Into<Value>>(self, op: &'static str, value: T) -> BinaryOp<Self>
    where
        Self: Sized,
    {
        BinaryOp::new(self, op, value.into())
    }

    /// Creates a case-insensitive substring match. `%` and `_` in `needle`
    /// match literally.
    fn icontains(self, needle: impl Into<String>) -> LikeOp<Self>
    where
        Self: Sized,
    {
        LikeOp::new(self, needle.into())
    }

    /// Creates a SQL `IN` condition.
    fn in_<T, I>(self, values: I) -> InOp<Self>
    where
        Self: Sized,
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(Into::into).collect();
        InOp::new(self, values)
    }

    /// Combines two expressions with `AND`.
    fn and<E: Expression>(self, other: E) -> LogicalOp<Self, E>
    where
        Self: Sized,
    {
        LogicalOp::new(self, other, "AND")
    }
}
