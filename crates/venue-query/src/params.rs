//! Request parameters.
//!
//! The query string of an incoming request is parsed once into
//! [`RequestParams`]: typed slots for the reserved keys (`q`, `page`, `limit`,
//! `sort`, `fields`) and a map of structured filters for everything else.
//! Every builder stage reads from this value instead of re-parsing strings.

use std::{collections::BTreeMap, sync::OnceLock};

use regex::Regex;
use tracing::warn;
use url::form_urlencoded;

use crate::{
    error::{QueryError, Result},
    filter::CmpOp,
    spec::SortKey,
};

/// Keys with a dedicated builder stage. They never become filters.
pub const RESERVED_KEYS: [&str; 5] = ["page", "limit", "sort", "fields", "q"];

/// How malformed input is handled while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsePolicy {
    /// Reject malformed values instead of dropping them.
    pub strict: bool,
}

impl ParsePolicy {
    pub const LENIENT: Self = Self { strict: false };
    pub const STRICT: Self = Self { strict: true };
}

/// The value side of a structured filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Equality with the literal text.
    Literal(String),
    /// `<op>:<number>`.
    Compare(CmpOp, f64),
    /// The key was repeated; matches any of the values.
    AnyOf(Vec<String>),
}

/// One token of the `fields` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    pub field: String,
    /// Written as `-field`.
    pub exclude: bool,
}

/// Parsed request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<Vec<SortKey>>,
    pub fields: Option<Vec<FieldToken>>,
    pub filters: BTreeMap<String, FilterValue>,
}

impl RequestParams {
    /// Parses a URL query string (with or without the leading `?`).
    ///
    /// # Example
    ///
    /// ```
    /// use venue_query::{FilterValue, ParsePolicy, RequestParams, CmpOp};
    ///
    /// let params = RequestParams::parse("q=pub&page=2&rating=gte:4", ParsePolicy::default()).unwrap();
    ///
    /// assert_eq!(params.q.as_deref(), Some("pub"));
    /// assert_eq!(params.page, Some(2));
    /// assert_eq!(params.filters["rating"], FilterValue::Compare(CmpOp::Gte, 4.0));
    /// ```
    pub fn parse(query: &str, policy: ParsePolicy) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()).into_owned(), policy)
    }

    /// Builds parameters from already decoded key/value pairs.
    ///
    /// A reserved key given more than once keeps its last value; any other
    /// key given more than once becomes [`FilterValue::AnyOf`].
    pub fn from_pairs<I, K, V>(pairs: I, policy: ParsePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            grouped.entry(key.into()).or_default().push(value.into());
        }

        let mut params = Self::default();
        for (key, mut values) in grouped {
            if RESERVED_KEYS.contains(&key.as_str()) {
                if let Some(value) = values.pop() {
                    params.set_reserved(&key, value, policy)?;
                }
                continue;
            }

            if !is_valid_field(&key) {
                reject(policy, QueryError::InvalidField(key))?;
                continue;
            }

            let filter = if values.len() > 1 {
                Some(FilterValue::AnyOf(values))
            } else {
                match values.pop() {
                    Some(value) => parse_filter_value(&key, value, policy)?,
                    None => None,
                }
            };
            if let Some(filter) = filter {
                params.filters.insert(key, filter);
            }
        }

        Ok(params)
    }

    fn set_reserved(&mut self, key: &str, value: String, policy: ParsePolicy) -> Result<()> {
        match key {
            "q" => {
                let term = value.trim();
                self.q = (!term.is_empty()).then(|| term.to_string());
            }
            "page" => self.page = coerce_positive(&value, policy, QueryError::InvalidPage)?,
            "limit" => self.limit = coerce_positive(&value, policy, QueryError::InvalidLimit)?,
            "sort" => self.sort = parse_sort(&value, policy)?,
            "fields" => self.fields = parse_fields(&value, policy)?,
            _ => {}
        }
        Ok(())
    }

    /// Whether a free-text search term was given.
    pub fn has_search(&self) -> bool {
        self.q.is_some()
    }
}

/// Whether `name` is an acceptable attribute path.
///
/// Names are dot-separated segments of letters, digits and underscores; the
/// first segment may not start with a digit. Operator keys such as `$where`
/// are rejected.
pub fn is_valid_field(name: &str) -> bool {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    let re = FIELD_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$").unwrap()
    });
    re.is_match(name)
}

/// Drops malformed input under a lenient policy, fails under a strict one.
fn reject(policy: ParsePolicy, err: QueryError) -> Result<()> {
    if policy.strict {
        return Err(err);
    }
    warn!(error = %err, "ignoring malformed query parameter");
    Ok(())
}

/// Numeric coercion for `page` and `limit`: fractional values are truncated,
/// anything non-numeric or below 1 means "use the default".
fn coerce_positive(
    value: &str,
    policy: ParsePolicy,
    err: fn(String) -> QueryError,
) -> Result<Option<u64>> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 1.0 => Ok(Some(n.trunc() as u64)),
        _ => {
            reject(policy, err(value.to_string()))?;
            Ok(None)
        }
    }
}

fn parse_filter_value(key: &str, value: String, policy: ParsePolicy) -> Result<Option<FilterValue>> {
    let Some((token, operand)) = value.split_once(':') else {
        return Ok(Some(FilterValue::Literal(value)));
    };
    let Some(op) = CmpOp::parse(token) else {
        return Ok(Some(FilterValue::Literal(value)));
    };

    match operand.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(FilterValue::Compare(op, n))),
        _ => {
            reject(
                policy,
                QueryError::InvalidNumber {
                    field: key.to_string(),
                    value,
                },
            )?;
            Ok(None)
        }
    }
}

fn parse_sort(value: &str, policy: ParsePolicy) -> Result<Option<Vec<SortKey>>> {
    let mut keys = Vec::new();
    for key in value.split(',').filter_map(SortKey::parse) {
        if !is_valid_field(&key.field) {
            reject(policy, QueryError::InvalidField(key.field))?;
            continue;
        }
        keys.push(key);
    }
    Ok((!keys.is_empty()).then_some(keys))
}

fn parse_fields(value: &str, policy: ParsePolicy) -> Result<Option<Vec<FieldToken>>> {
    let mut tokens = Vec::new();
    for raw in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (field, exclude) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };
        if !is_valid_field(field) {
            reject(policy, QueryError::InvalidField(raw.to_string()))?;
            continue;
        }
        tokens.push(FieldToken {
            field: field.to_string(),
            exclude,
        });
    }
    Ok((!tokens.is_empty()).then_some(tokens))
}
