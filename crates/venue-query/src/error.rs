//! Error types for venue-query.

use miette::Diagnostic;
use thiserror::Error;

/// Error type for parsing request parameters and loading documents.
///
/// Building a query never fails; these errors only surface when a strict
/// [`crate::ParsePolicy`] rejects malformed input, or when documents handed
/// to a [`crate::MemoryCollection`] cannot be decoded.
#[derive(Error, Diagnostic, Debug)]
pub enum QueryError {
    #[error("Invalid numeric filter for `{field}`: {value}")]
    #[diagnostic(
        code(venue_query::invalid_number),
        help("Use `<op>:<number>` where op is one of gte, gt, lte, lt, eq")
    )]
    InvalidNumber { field: String, value: String },

    #[error("Invalid field name: {0}")]
    #[diagnostic(
        code(venue_query::invalid_field),
        help("Field names may contain letters, digits and underscores, separated by dots")
    )]
    InvalidField(String),

    #[error("Invalid page number: {0}")]
    #[diagnostic(
        code(venue_query::invalid_page),
        help("Pages are numbered from 1")
    )]
    InvalidPage(String),

    #[error("Invalid page size: {0}")]
    #[diagnostic(
        code(venue_query::invalid_limit),
        help("The page size must be a positive integer")
    )]
    InvalidLimit(String),

    #[error("Invalid document: {0}")]
    #[diagnostic(
        code(venue_query::invalid_document),
        help("Documents must be JSON objects")
    )]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    #[diagnostic(code(venue_query::json))]
    Json(#[from] serde_json::Error),
}

/// Result type alias for venue-query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
