use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use venue_config::ConfigError;
use venue_db::DbError;
use venue_query::QueryError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Error while {action}")]
    #[diagnostic(code(venues::io), help("Check the path and file permissions"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database not found: {}", .0.display())]
    #[diagnostic(
        code(venues::database_not_found),
        help("Create it with `venues import --db <path> ...`")
    )]
    DatabaseNotFound(PathBuf),

    #[error("No document source given")]
    #[diagnostic(code(venues::missing_source), help("Pass --db or --file"))]
    MissingSource,

    #[error("Failed to set up logging: {0}")]
    #[diagnostic(code(venues::logging))]
    Logging(String),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(venues::output))]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> CliResult<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> CliResult<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| CliError::IoError {
            action: context(),
            source: err,
        })
    }
}
