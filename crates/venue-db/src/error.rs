//! Error types for venue-db.

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for venue-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(venue_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(
        code(venue_db::query),
        help("The database may have been written by another tool. Try re-importing.")
    )]
    QueryError(String),

    #[error("Invalid collection name: {0}")]
    #[diagnostic(
        code(venue_db::invalid_collection),
        help("Collection names may contain letters, digits and underscores")
    )]
    InvalidCollection(String),

    #[error("Collection not found: {0}")]
    #[diagnostic(
        code(venue_db::unknown_collection),
        help("Import documents into the collection first")
    )]
    UnknownCollection(String),

    #[error("Invalid document: {0}")]
    #[diagnostic(
        code(venue_db::invalid_document),
        help("Only JSON objects can be stored")
    )]
    InvalidDocument(String),

    #[error("Stored document is not valid JSON: {0}")]
    #[diagnostic(
        code(venue_db::json),
        help("The database may be corrupted. Try re-importing.")
    )]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => DbError::QueryError(message),
            other => DbError::QueryError(other.to_string()),
        }
    }
}

/// Result type alias for venue-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
