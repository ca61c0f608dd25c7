//! Executing query specifications.
//!
//! [`Collection`] is the seam between a built [`QuerySpec`] and whatever
//! stores the documents. [`MemoryCollection`] evaluates specs over documents
//! held in memory; other crates implement it for real storage.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::trace;

use crate::{
    document::{compare_values, resolve_path},
    error::{QueryError, Result},
    spec::{QuerySpec, SortKey},
};

/// A store that can execute a [`QuerySpec`].
pub trait Collection {
    type Error;

    /// Returns the page of documents described by `spec`, projected.
    fn fetch(&self, spec: &QuerySpec) -> std::result::Result<Vec<Value>, Self::Error>;

    /// Counts documents matching `spec`'s filter. Pagination is ignored by
    /// callers passing [`QuerySpec::count_spec`].
    fn count(&self, spec: &QuerySpec) -> std::result::Result<u64, Self::Error>;

    /// Fetches a page together with the total number of matches.
    fn fetch_page(&self, spec: &QuerySpec) -> std::result::Result<(Vec<Value>, u64), Self::Error> {
        let total = self.count(&spec.count_spec())?;
        let documents = self.fetch(spec)?;
        Ok((documents, total))
    }
}

/// Documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    documents: Vec<Value>,
}

impl MemoryCollection {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    /// Loads documents from a JSON array or from JSON lines.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let documents: Vec<Value> = if input.trim_start().starts_with('[') {
            serde_json::from_str(input)?
        } else {
            input
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(serde_json::from_str)
                .collect::<std::result::Result<_, _>>()?
        };

        if let Some(pos) = documents.iter().position(|doc| !doc.is_object()) {
            return Err(QueryError::InvalidDocument(format!(
                "entry {} is not an object",
                pos + 1
            )));
        }

        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }
}

impl Collection for MemoryCollection {
    type Error = QueryError;

    fn fetch(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        let mut matched: Vec<&Value> = self
            .documents
            .iter()
            .filter(|doc| spec.filter.matches(doc))
            .collect();

        if !spec.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &spec.sort));
        }

        let skip = usize::try_from(spec.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = spec
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        trace!(
            collection = %spec.collection,
            matched = matched.len(),
            skip = skip,
            "fetching from memory"
        );

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| spec.projection.apply(doc))
            .collect())
    }

    fn count(&self, spec: &QuerySpec) -> Result<u64> {
        let count = self
            .documents
            .iter()
            .filter(|doc| spec.filter.matches(doc))
            .count();
        Ok(count as u64)
    }
}

/// Orders two documents by a multi-key sort. Ties keep insertion order
/// because the sort is stable.
fn compare_documents(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_values(resolve_path(a, &key.field), resolve_path(b, &key.field));
        let ord = if key.is_desc() { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
