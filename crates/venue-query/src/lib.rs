//! Query specifications for venue listing endpoints.
//!
//! A listing request's query string is parsed into [`RequestParams`] and fed
//! to [`ApiFeatures`], which produces a [`QuerySpec`]: filter, ordering,
//! projection and page window. A [`Collection`] executes the spec.

pub mod collection;
pub mod document;
pub mod error;
pub mod features;
pub mod filter;
pub mod params;
pub mod spec;

pub use collection::{Collection, MemoryCollection};
pub use error::{QueryError, Result};
pub use features::{ApiFeatures, FeaturePolicy, ProjectionPolicy};
pub use filter::{CmpOp, Filter};
pub use params::{is_valid_field, FieldToken, FilterValue, ParsePolicy, RequestParams};
pub use spec::{Page, Projection, QuerySpec, SortDirection, SortKey};
