pub mod annotations;
pub mod config;
pub mod error;

#[cfg(test)]
pub mod test_utils;

pub use config::{config_path, CollectionConfig, Config};
pub use error::{ConfigError, Result};
