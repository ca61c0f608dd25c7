use std::{fs, path::Path};

use nu_ansi_term::Color::{Blue, Green};
use tracing::{info, warn};
use venue_db::DocumentStore;
use venue_query::MemoryCollection;

use crate::{
    error::{CliResult, ErrorContext},
    utils::Colored,
};

/// Loads every document of `file` into `collection`. Returns the number of
/// documents imported.
pub fn import_documents(db: &Path, collection: &str, file: &Path) -> CliResult<usize> {
    let content =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let documents = MemoryCollection::from_json_str(&content)?;
    if documents.is_empty() {
        warn!("No documents found in {}", file.display());
        return Ok(0);
    }

    let store = DocumentStore::open(db)?;
    let count = store.insert_many(collection, documents.documents())?;

    info!(
        "Imported {} documents into {}",
        Colored(Green, count),
        Colored(Blue, collection)
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use venue_query::{Collection, QuerySpec};

    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_import_json_array() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("blogs.json");
        fs::write(&file, r#"[{"title": "One"}, {"title": "Two"}]"#).unwrap();
        let db = dir.path().join("venues.db");

        assert_eq!(import_documents(&db, "blogs", &file).unwrap(), 2);
        assert_eq!(import_documents(&db, "blogs", &file).unwrap(), 2);

        let store = DocumentStore::open(&db).unwrap();
        let blogs = store.collection("blogs").unwrap();
        assert_eq!(blogs.count(&QuerySpec::new("blogs")).unwrap(), 4);
    }

    #[test]
    fn test_import_empty_file_creates_nothing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.json");
        fs::write(&file, "[]").unwrap();
        let db = dir.path().join("venues.db");

        assert_eq!(import_documents(&db, "blogs", &file).unwrap(), 0);
        assert!(!db.exists());
    }

    #[test]
    fn test_import_rejects_non_objects() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "[1, 2, 3]").unwrap();

        assert!(matches!(
            import_documents(&dir.path().join("venues.db"), "blogs", &file),
            Err(CliError::Query(_))
        ));
    }
}
