//! Expression types for building SQL conditions.
//!
//! This module contains the building blocks of collection filters.

pub mod filter;
pub mod ops;
pub mod path;

pub use path::{JsonPath, JsonType, TypeRank};
