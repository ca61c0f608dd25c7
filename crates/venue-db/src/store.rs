//! Document storage.
//!
//! A [`DocumentStore`] is one SQLite database. Each collection is a table of
//! JSON documents:
//!
//! ```sql
//! CREATE TABLE <collection> (id INTEGER PRIMARY KEY, doc TEXT NOT NULL)
//! ```

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use regex::Regex;
use rusqlite::{
    functions::FunctionFlags,
    params,
    types::ValueRef,
    Connection, OpenFlags,
};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    collection::SqliteCollection,
    error::{DbError, Result},
};

/// SQL function lowercasing text with Unicode case folding. SQLite's own
/// `LOWER` only folds ASCII.
pub const LOWER_FUNCTION: &str = "unicode_lower";

/// A SQLite database holding document collections.
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Mutex<Connection>>,
    read_only: bool,
}

impl DocumentStore {
    /// Opens (or creates) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn =
            Connection::open(path).map_err(|err| DbError::ConnectionError(err.to_string()))?;

        // WAL mode for better concurrent access
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(|err| DbError::ConnectionError(err.to_string()))?;

        debug!(path = %path.display(), "opened document store");
        Self::from_connection(conn, false)
    }

    /// Opens an existing database file for reading. A missing file is an
    /// error, and collections are never created.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| DbError::ConnectionError(format!("{}: {err}", path.display())))?;

        debug!(path = %path.display(), "opened document store read-only");
        Self::from_connection(conn, true)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|err| DbError::ConnectionError(err.to_string()))?;
        Self::from_connection(conn, false)
    }

    fn from_connection(conn: Connection, read_only: bool) -> Result<Self> {
        register_functions(&conn).map_err(|err| DbError::ConnectionError(err.to_string()))?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            read_only,
        })
    }

    /// Returns a handle to `name`. A writable store creates the collection if
    /// needed; a read-only one requires it to exist.
    pub fn collection(&self, name: &str) -> Result<SqliteCollection> {
        if self.read_only {
            if !is_valid_collection(name) {
                return Err(DbError::InvalidCollection(name.to_string()));
            }
            if !self.has_collection(name)? {
                return Err(DbError::UnknownCollection(name.to_string()));
            }
        } else {
            self.ensure_collection(name)?;
        }
        Ok(SqliteCollection::new(self.db.clone(), name))
    }

    fn has_collection(&self, name: &str) -> Result<bool> {
        let conn = lock(&self.db)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Inserts one document and returns its row id.
    pub fn insert(&self, collection: &str, document: &Value) -> Result<i64> {
        self.ensure_collection(collection)?;
        let json = encode(document)?;

        let conn = lock(&self.db)?;
        conn.execute(
            &format!("INSERT INTO \"{collection}\" (doc) VALUES (?1)"),
            params![json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Inserts documents in a single transaction. Returns the number inserted.
    ///
    /// Nothing is inserted if any document is not an object.
    pub fn insert_many<'a, I>(&self, collection: &str, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        self.ensure_collection(collection)?;
        let encoded = documents
            .into_iter()
            .map(encode)
            .collect::<Result<Vec<_>>>()?;

        let mut conn = lock(&self.db)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO \"{collection}\" (doc) VALUES (?1)"))?;
            for json in &encoded {
                stmt.execute(params![json])?;
            }
        }
        tx.commit()?;

        debug!(collection = collection, count = encoded.len(), "inserted documents");
        Ok(encoded.len())
    }

    /// Lists the collections in this database.
    pub fn collections(&self) -> Result<Vec<String>> {
        let conn = lock(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn ensure_collection(&self, name: &str) -> Result<()> {
        if !is_valid_collection(name) {
            return Err(DbError::InvalidCollection(name.to_string()));
        }
        let conn = lock(&self.db)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (id INTEGER PRIMARY KEY, doc TEXT NOT NULL)"
            ),
            [],
        )?;
        trace!(collection = name, "ensured collection table");
        Ok(())
    }
}

/// Whether `name` can be used as a collection (table) name.
pub fn is_valid_collection(name: &str) -> bool {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
    re.is_match(name) && !name.starts_with("sqlite_")
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        LOWER_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(text) => Some(String::from_utf8_lossy(text).to_lowercase()),
                _ => None,
            })
        },
    )
}

pub(crate) fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|_| DbError::ConnectionError("database lock poisoned".to_string()))
}

fn encode(document: &Value) -> Result<String> {
    if !document.is_object() {
        return Err(DbError::InvalidDocument(format!(
            "expected an object, got {document}"
        )));
    }
    Ok(serde_json::to_string(document)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;
    use venue_query::{Collection, QuerySpec};

    use super::*;

    #[test]
    fn test_collection_names() {
        assert!(is_valid_collection("venues"));
        assert!(is_valid_collection("_scratch2"));
        assert!(!is_valid_collection("venues; DROP TABLE users"));
        assert!(!is_valid_collection("2fa"));
        assert!(!is_valid_collection("sqlite_master"));
        assert!(!is_valid_collection(""));
    }

    #[test]
    fn test_insert_and_list() {
        let store = DocumentStore::open_in_memory().unwrap();

        let first = store.insert("venues", &json!({"name": "Tap"})).unwrap();
        let second = store.insert("venues", &json!({"name": "Bar"})).unwrap();
        assert!(second > first);

        store.insert_many("blogs", &[json!({"title": "a"})]).unwrap();
        assert_eq!(store.collections().unwrap(), vec!["blogs", "venues"]);
    }

    #[test]
    fn test_rejects_non_objects() {
        let store = DocumentStore::open_in_memory().unwrap();

        assert!(matches!(
            store.insert("venues", &json!([1, 2])),
            Err(DbError::InvalidDocument(_))
        ));
        assert!(matches!(
            store.insert_many("venues", &[json!({"ok": true}), json!("nope")]),
            Err(DbError::InvalidDocument(_))
        ));
        assert_eq!(
            store.collection("venues").unwrap().count(&QuerySpec::new("venues")).unwrap(),
            0
        );
        assert!(matches!(
            store.insert("bad name", &json!({})),
            Err(DbError::InvalidCollection(_))
        ));
    }

    #[test]
    fn test_unicode_lower_function() {
        let store = DocumentStore::open_in_memory().unwrap();
        let conn = lock(&store.db).unwrap();

        let lowered: String = conn
            .query_row("SELECT unicode_lower('CAFÉ ÉTOILE')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(lowered, "café étoile");

        let number: Option<String> = conn
            .query_row("SELECT unicode_lower(42)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(number, None);
    }

    #[test]
    fn test_read_only_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("venues.db");

        assert!(matches!(
            DocumentStore::open_read_only(&path),
            Err(DbError::ConnectionError(_))
        ));
        assert!(!path.exists());

        DocumentStore::open(&path)
            .unwrap()
            .insert("venues", &json!({"name": "Tap"}))
            .unwrap();

        let store = DocumentStore::open_read_only(&path).unwrap();
        let venues = store.collection("venues").unwrap();
        assert_eq!(venues.count(&QuerySpec::new("venues")).unwrap(), 1);
        assert!(matches!(
            store.collection("venuse"),
            Err(DbError::UnknownCollection(_))
        ));
        assert!(store.insert("venues", &json!({"name": "Bar"})).is_err());
        assert_eq!(store.collections().unwrap(), vec!["venues"]);
    }

    #[test]
    fn test_persists_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("venues.db");

        {
            let store = DocumentStore::open(&path).unwrap();
            store
                .insert_many("venues", &[json!({"name": "Tap"}), json!({"name": "Bar"})])
                .unwrap();
        }

        let store = DocumentStore::open(&path).unwrap();
        let venues = store.collection("venues").unwrap();
        assert_eq!(venues.count(&QuerySpec::new("venues")).unwrap(), 2);
    }
}
