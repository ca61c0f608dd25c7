use std::{fs, path::Path};

use nu_ansi_term::Color::Cyan;
use serde::Serialize;
use serde_json::Value;
use tabled::{
    builder::Builder,
    settings::{Panel, Style},
};
use tracing::debug;
use venue_config::Config;
use venue_db::DocumentStore;
use venue_query::{ApiFeatures, Collection, MemoryCollection, Page, QuerySpec, RequestParams};

use crate::{
    error::{CliError, CliResult, ErrorContext},
    utils::{cell, Colored},
};

/// Where documents are read from.
pub enum Source<'a> {
    Db(&'a Path),
    File(&'a Path),
}

/// One page of results as printed by `query`.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<Value>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl QueryResponse {
    pub fn new(results: Vec<Value>, page: Page) -> Self {
        Self {
            results,
            page: page.page,
            limit: page.limit,
            total: page.total,
            pages: page.total_pages(),
        }
    }
}

/// Builds the query for `collection` from a query string, using the
/// collection's configured search fields and defaults.
pub fn build_spec(config: &Config, collection: &str, query: &str) -> CliResult<QuerySpec> {
    let params = RequestParams::parse(query, config.parse_policy())?;
    let policy = config.feature_policy(collection);

    let spec = ApiFeatures::new(QuerySpec::new(collection), &params, &policy)
        .apply_all(config.search_fields(collection))
        .finish();
    Ok(spec)
}

pub fn fetch(config: &Config, collection: &str, source: Source, query: &str) -> CliResult<QueryResponse> {
    let spec = build_spec(config, collection, query)?;

    let (results, total) = match source {
        Source::Db(path) => {
            if !path.is_file() {
                return Err(CliError::DatabaseNotFound(path.to_path_buf()));
            }
            let store = DocumentStore::open_read_only(path)?;
            store.collection(collection)?.fetch_page(&spec)?
        }
        Source::File(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            MemoryCollection::from_json_str(&content)?.fetch_page(&spec)?
        }
    };

    debug!(returned = results.len(), total = total, "query finished");
    Ok(QueryResponse::new(results, Page::from_spec(&spec, total)))
}

pub fn run_query(
    config: &Config,
    collection: &str,
    source: Source,
    query: &str,
    table: bool,
) -> CliResult<()> {
    let response = fetch(config, collection, source, query)?;

    if table {
        println!("{}", render_table(collection, &response));
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}

/// Columns are every attribute seen, in order of first appearance.
pub fn render_table(collection: &str, response: &QueryResponse) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for doc in &response.results {
        if let Value::Object(map) = doc {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut builder = Builder::new();
    builder.push_record(columns.iter().map(|c| Colored(Cyan, c).to_string()));
    for doc in &response.results {
        builder.push_record(columns.iter().map(|c| cell(doc.get(*c))));
    }

    builder
        .build()
        .with(Panel::header(format!(
            "{collection}: page {} of {} ({} total)",
            response.page, response.pages, response.total
        )))
        .with(Style::rounded())
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    const VENUES: &str = r#"
{"_id": 1, "name": "The Sober Pub", "address": "1 High St", "rating": 4.5, "createdAt": "2024-01-01", "password": "x"}
{"_id": 2, "name": "Juice Bar", "address": "2 Pub Lane", "rating": 3.9, "createdAt": "2024-02-01"}
{"_id": 3, "name": "Tea Room", "address": "3 Mill Rd", "rating": 4.1, "createdAt": "2024-03-01"}
"#;

    #[test]
    fn test_build_spec_uses_collection_config() {
        let config = Config::default_config();

        let spec = build_spec(&config, "venues", "q=pub&limit=500").unwrap();
        assert_eq!(spec.limit, Some(100));
        assert!(spec.filter.matches(&json!({"description": "a pub"})));

        let spec = build_spec(&config, "ratings", "q=pub").unwrap();
        assert!(spec.filter.is_all());
    }

    #[test]
    fn test_strict_config_rejects_bad_params() {
        let mut config = Config::default_config();
        config.strict = Some(true);

        assert!(build_spec(&config, "venues", "rating=gte:abc").is_err());
    }

    #[test]
    fn test_fetch_file_and_db_agree() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("venues.jsonl");
        fs::write(&file, VENUES).unwrap();

        let db = dir.path().join("venues.db");
        let docs = MemoryCollection::from_json_str(VENUES).unwrap();
        DocumentStore::open(&db)
            .unwrap()
            .insert_many("venues", docs.documents())
            .unwrap();

        let config = Config::default_config();
        let query = "q=pub&sort=-rating&limit=1";
        let from_file = fetch(&config, "venues", Source::File(&file), query).unwrap();
        let from_db = fetch(&config, "venues", Source::Db(&db), query).unwrap();

        assert_eq!(from_file.results, from_db.results);
        assert_eq!(from_file.results, vec![json!({"_id": 1, "name": "The Sober Pub", "address": "1 High St", "rating": 4.5, "createdAt": "2024-01-01"})]);
        assert_eq!((from_file.total, from_file.pages), (2, 2));
    }

    #[test]
    fn test_missing_file_reports_action() {
        let config = Config::default_config();
        let err = fetch(
            &config,
            "venues",
            Source::File(Path::new("/nonexistent/venues.json")),
            "",
        )
        .unwrap_err();

        assert!(err.to_string().contains("reading /nonexistent/venues.json"));
    }

    #[test]
    fn test_missing_database_is_not_created() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("venus.db");
        let config = Config::default_config();

        let err = fetch(&config, "venues", Source::Db(&db), "").unwrap_err();
        assert!(matches!(err, CliError::DatabaseNotFound(_)));
        assert!(!db.exists());
    }

    #[test]
    fn test_unknown_collection_in_database() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("venues.db");
        let docs = MemoryCollection::from_json_str(VENUES).unwrap();
        DocumentStore::open(&db)
            .unwrap()
            .insert_many("venues", docs.documents())
            .unwrap();

        let config = Config::default_config();
        let err = fetch(&config, "venuse", Source::Db(&db), "").unwrap_err();
        assert!(matches!(
            err,
            CliError::Db(venue_db::DbError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_render_table() {
        let response = QueryResponse::new(
            vec![json!({"name": "Tap", "rating": 4}), json!({"name": "Bar", "city": "York"})],
            Page {
                page: 1,
                limit: 10,
                total: 2,
            },
        );

        let table = render_table("venues", &response);
        assert!(table.contains("venues: page 1 of 1 (2 total)"));
        assert!(table.contains("York"));
        assert!(table.contains("city"));
    }

    #[test]
    fn test_response_json_shape() {
        let response = QueryResponse::new(
            vec![],
            Page {
                page: 3,
                limit: 5,
                total: 11,
            },
        );

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"results": [], "page": 3, "limit": 5, "total": 11, "pages": 3})
        );
    }
}
