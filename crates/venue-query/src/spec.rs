//! The query specification: a not-yet-executed query.
//!
//! A [`QuerySpec`] describes which documents to return (filter), in which
//! order (sort), which attributes to keep (projection), and which slice of
//! the result to return (skip and limit). Executors such as
//! [`crate::MemoryCollection`] turn it into results.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{
    document::{copy_path, remove_path},
    filter::Filter,
};

/// Sort direction for a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One key of a multi-key ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses a single sort token; a leading `-` means descending.
    ///
    /// Returns `None` for an empty token. Field-name validation is left to
    /// the caller.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token.strip_prefix('-') {
            Some(field) if !field.is_empty() => Some(Self::desc(field)),
            Some(_) => None,
            None if token.is_empty() => None,
            None => Some(Self::asc(token)),
        }
    }

    pub fn is_desc(&self) -> bool {
        self.direction == SortDirection::Desc
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.field),
            SortDirection::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// Which attributes of a matching document are returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every attribute.
    #[default]
    All,
    /// Only the listed attributes (plus `_id`).
    Include(Vec<String>),
    /// Every attribute except the listed ones.
    Exclude(Vec<String>),
}

impl Projection {
    /// Shapes a document according to this projection.
    ///
    /// Non-object documents are returned unchanged.
    pub fn apply(&self, doc: &Value) -> Value {
        let Value::Object(map) = doc else {
            return doc.clone();
        };

        match self {
            Projection::All => doc.clone(),
            Projection::Include(fields) => {
                let mut out = Map::new();
                if let Some(id) = map.get("_id") {
                    out.insert("_id".to_string(), id.clone());
                }
                for field in fields {
                    copy_path(map, &mut out, field);
                }
                Value::Object(out)
            }
            Projection::Exclude(fields) => {
                let mut out = map.clone();
                for field in fields {
                    remove_path(&mut out, field);
                }
                Value::Object(out)
            }
        }
    }

    /// Renders the projection as a document-database projection document.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        match self {
            Projection::All => {}
            Projection::Include(fields) => {
                for field in fields {
                    map.insert(field.clone(), json!(1));
                }
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    map.insert(field.clone(), json!(0));
                }
            }
        }
        Value::Object(map)
    }
}

/// A fully described, not-yet-executed query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub collection: String,
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl QuerySpec {
    /// A query matching every document of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: Filter::All,
            sort: Vec::new(),
            projection: Projection::All,
            skip: None,
            limit: None,
        }
    }

    /// Narrows the query with an additional predicate (AND).
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// The query counting every match, ignoring ordering, projection and
    /// pagination. Used to compute the total number of pages.
    pub fn count_spec(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            filter: self.filter.clone(),
            sort: Vec::new(),
            projection: Projection::All,
            skip: None,
            limit: None,
        }
    }

    /// Renders the whole specification as a JSON document.
    ///
    /// The ordering is rendered as a list of single-key documents so the key
    /// order survives serialization.
    pub fn to_document(&self) -> Value {
        let sort: Vec<Value> = self
            .sort
            .iter()
            .map(|key| {
                let mut entry = Map::new();
                entry.insert(key.field.clone(), json!(if key.is_desc() { -1 } else { 1 }));
                Value::Object(entry)
            })
            .collect();

        json!({
            "collection": self.collection,
            "filter": self.filter.to_document(),
            "sort": sort,
            "projection": self.projection.to_document(),
            "skip": self.skip,
            "limit": self.limit,
        })
    }
}

/// Pagination summary for a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

impl Page {
    /// Derives the page number from a spec's skip and limit.
    ///
    /// A spec without a limit is treated as a single page holding every match.
    pub fn from_spec(spec: &QuerySpec, total: u64) -> Self {
        match spec.limit {
            Some(limit) if limit > 0 => Self {
                page: spec.skip.unwrap_or(0) / limit + 1,
                limit,
                total,
            },
            _ => Self {
                page: 1,
                limit: total,
                total,
            },
        }
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }
}
