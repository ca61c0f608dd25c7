//! SQLite-backed document collections.
//!
//! Documents are stored as JSON text, one table per collection, and queried
//! by compiling a [`venue_query::QuerySpec`] to SQL over `json_extract`.
//!
//! ```rust
//! use serde_json::json;
//! use venue_db::DocumentStore;
//! use venue_query::{Collection, Filter, QuerySpec};
//!
//! let store = DocumentStore::open_in_memory().unwrap();
//! store.insert("venues", &json!({"name": "The Sober Pub", "city": "Leeds"})).unwrap();
//! store.insert("venues", &json!({"name": "Juice Bar", "city": "York"})).unwrap();
//!
//! let spec = QuerySpec::new("venues").with_filter(Filter::eq("city", "Leeds"));
//! let (docs, total) = store.collection("venues").unwrap().fetch_page(&spec).unwrap();
//!
//! assert_eq!(total, 1);
//! assert_eq!(docs[0]["name"], "The Sober Pub");
//! ```

pub mod collection;
pub mod error;
pub mod expr;
pub mod store;
pub mod traits;

pub use collection::SqliteCollection;
pub use error::{DbError, Result};
pub use store::{is_valid_collection, DocumentStore};
