//! The request-driven query builder.
//!
//! [`ApiFeatures`] refines a base [`QuerySpec`] from [`RequestParams`] in
//! five stages: text search, structured filters, ordering, field selection
//! and pagination. Each stage consumes the builder and returns it, so the
//! stages chain:
//!
//! ```
//! use venue_query::{ApiFeatures, FeaturePolicy, ParsePolicy, QuerySpec, RequestParams};
//!
//! let params = RequestParams::parse("q=pub&page=2&limit=5", ParsePolicy::default()).unwrap();
//! let policy = FeaturePolicy::default();
//!
//! let spec = ApiFeatures::new(QuerySpec::new("venues"), &params, &policy)
//!     .search(&["name", "address"])
//!     .filter()
//!     .sort()
//!     .select()
//!     .paginate()
//!     .finish();
//!
//! assert_eq!((spec.skip, spec.limit), (Some(5), Some(5)));
//! ```
//!
//! No stage fails. Malformed input has already been dropped (or rejected)
//! when the parameters were parsed.

use tracing::{debug, trace};

use crate::{
    filter::Filter,
    params::{FilterValue, RequestParams},
    spec::{Projection, QuerySpec, SortKey},
};

/// Attributes hidden from responses unless explicitly selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionPolicy {
    pub hidden: Vec<String>,
    /// Also strip hidden attributes from an explicit `fields` selection.
    pub strip_on_select: bool,
}

impl Default for ProjectionPolicy {
    fn default() -> Self {
        Self {
            hidden: vec!["__v".to_string(), "password".to_string()],
            strip_on_select: false,
        }
    }
}

/// Defaults applied when the request leaves a stage unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePolicy {
    pub default_limit: u64,
    /// Upper bound on the page size; `None` leaves it unbounded.
    pub max_limit: Option<u64>,
    pub default_sort: Vec<SortKey>,
    pub projection: ProjectionPolicy,
}

impl Default for FeaturePolicy {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: None,
            default_sort: vec![SortKey::desc("createdAt")],
            projection: ProjectionPolicy::default(),
        }
    }
}

/// Builds a [`QuerySpec`] from request parameters.
pub struct ApiFeatures<'a> {
    spec: QuerySpec,
    params: &'a RequestParams,
    policy: &'a FeaturePolicy,
}

impl<'a> ApiFeatures<'a> {
    /// Starts from `base`, which may already be narrowed by the caller
    /// (for example to the ratings of one venue).
    pub fn new(base: QuerySpec, params: &'a RequestParams, policy: &'a FeaturePolicy) -> Self {
        Self {
            spec: base,
            params,
            policy,
        }
    }

    /// Free-text search over an allow-list of attributes.
    ///
    /// Matches documents where any of `fields` contains the `q` term,
    /// ignoring case. Does nothing when `q` is absent or `fields` is empty.
    /// `fields` must come from the caller, never from the request.
    pub fn search<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        let Some(term) = self.params.q.as_deref() else {
            return self;
        };
        if fields.is_empty() {
            debug!(
                collection = %self.spec.collection,
                "search term given but no searchable fields, skipping"
            );
            return self;
        }

        let clauses = fields
            .iter()
            .map(|field| Filter::contains(field.as_ref(), term))
            .collect();

        trace!(term = term, fields = fields.len(), "applying text search");
        self.spec = self.spec.with_filter(Filter::any(clauses));
        self
    }

    /// Structured filters: one predicate per non-reserved parameter, ANDed.
    pub fn filter(mut self) -> Self {
        for (field, value) in &self.params.filters {
            let filter = match value {
                FilterValue::Literal(literal) => Filter::eq(field, literal.as_str()),
                FilterValue::Compare(op, number) => Filter::compare(field, *op, *number),
                FilterValue::AnyOf(values) => Filter::in_(field, values.iter().cloned()),
            };
            trace!(field = %field, "applying structured filter");
            self.spec = self.spec.with_filter(filter);
        }
        self
    }

    /// Ordering: the requested keys, or the policy default.
    ///
    /// Replaces any previous ordering, so applying it twice is the same as
    /// applying it once.
    pub fn sort(mut self) -> Self {
        self.spec.sort = match &self.params.sort {
            Some(keys) => keys.clone(),
            None => self.policy.default_sort.clone(),
        };
        self
    }

    /// Field selection.
    ///
    /// Positive `fields` tokens select exactly those attributes (exclusion
    /// tokens mixed in are ignored). Only exclusion tokens hide those
    /// attributes on top of the policy's hidden set. Without `fields` the
    /// hidden set alone is excluded.
    pub fn select(mut self) -> Self {
        let policy = &self.policy.projection;
        let hidden = policy.hidden.clone();

        self.spec.projection = match self.params.fields.as_deref() {
            Some(tokens) if tokens.iter().any(|t| !t.exclude) => {
                let mut include: Vec<String> = Vec::new();
                for token in tokens.iter().filter(|t| !t.exclude) {
                    if !include.contains(&token.field) {
                        include.push(token.field.clone());
                    }
                }
                if policy.strip_on_select {
                    include.retain(|field| !hidden.contains(field));
                }
                if include.is_empty() {
                    Projection::Exclude(hidden)
                } else {
                    Projection::Include(include)
                }
            }
            Some(tokens) => {
                let mut exclude = hidden;
                for token in tokens {
                    if !exclude.contains(&token.field) {
                        exclude.push(token.field.clone());
                    }
                }
                Projection::Exclude(exclude)
            }
            None => Projection::Exclude(hidden),
        };
        self
    }

    /// Pagination: `skip = (page - 1) * limit`.
    ///
    /// `page` defaults to 1 and `limit` to the policy default. A limit above
    /// the policy's `max_limit` is clamped.
    pub fn paginate(mut self) -> Self {
        let page = self.params.page.unwrap_or(1).max(1);
        let mut limit = self.params.limit.unwrap_or(self.policy.default_limit);
        if let Some(max) = self.policy.max_limit {
            if limit > max {
                debug!(requested = limit, max = max, "clamping page size");
                limit = max;
            }
        }

        let skip = (page - 1).saturating_mul(limit);
        trace!(skip = skip, limit = limit, "applying pagination");
        self.spec.skip = Some(skip);
        self.spec.limit = Some(limit);
        self
    }

    /// Runs every stage in the fixed order
    /// search, filter, sort, select, paginate.
    pub fn apply_all<S: AsRef<str>>(self, search_fields: &[S]) -> Self {
        self.search(search_fields)
            .filter()
            .sort()
            .select()
            .paginate()
    }

    /// The query built so far.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Hands the finished query back for execution.
    pub fn finish(self) -> QuerySpec {
        debug!(
            collection = %self.spec.collection,
            skip = ?self.spec.skip,
            limit = ?self.spec.limit,
            "built query"
        );
        self.spec
    }
}
