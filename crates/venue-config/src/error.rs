use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(venue_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(venue_config::toml_deserialize),
        help("Check your venues.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid default page size: {0}")]
    #[diagnostic(
        code(venue_config::invalid_default_limit),
        help("default_limit must be at least 1")
    )]
    InvalidDefaultLimit(u64),

    #[error("max_limit ({max}) is smaller than default_limit ({default})")]
    #[diagnostic(
        code(venue_config::invalid_max_limit),
        help("Raise max_limit or lower default_limit")
    )]
    InvalidMaxLimit { max: u64, default: u64 },

    #[error("Invalid default sort: {0}")]
    #[diagnostic(
        code(venue_config::invalid_sort),
        help("Use comma-separated field names, prefixed with `-` for descending order")
    )]
    InvalidSort(String),

    #[error("Invalid collection name: {0}")]
    #[diagnostic(
        code(venue_config::invalid_collection),
        help("Collection names may contain letters, digits and underscores")
    )]
    InvalidCollection(String),

    #[error("Invalid field `{field}` in collection `{collection}`")]
    #[diagnostic(
        code(venue_config::invalid_field),
        help("Field names may contain letters, digits and underscores, separated by dots")
    )]
    InvalidField { collection: String, field: String },

    #[error("Invalid hidden field `{0}`")]
    #[diagnostic(
        code(venue_config::invalid_hidden_field),
        help("Field names may contain letters, digits and underscores, separated by dots")
    )]
    InvalidHiddenField(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(venue_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(venue_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(venue_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
