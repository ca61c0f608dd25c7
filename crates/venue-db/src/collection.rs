//! Executing query specifications against a SQLite table.

use std::sync::{Arc, Mutex};

use rusqlite::{types::Value, Connection, ToSql};
use serde_json::Value as Document;
use tracing::trace;
use venue_query::{Collection, QuerySpec};

use crate::{
    error::{DbError, Result},
    expr::{path::DOC_COLUMN, JsonPath, TypeRank},
    store::lock,
    traits::Expression,
};

/// One collection of a [`crate::DocumentStore`].
///
/// The table is always this collection's own; `QuerySpec::collection` is not
/// consulted.
#[derive(Clone)]
pub struct SqliteCollection {
    db: Arc<Mutex<Connection>>,
    name: String,
}

impl SqliteCollection {
    pub(crate) fn new(db: Arc<Mutex<Connection>>, name: &str) -> Self {
        Self {
            db,
            name: name.to_string(),
        }
    }

    /// Renders the SELECT for `spec`: filter, ordering (type rank, then
    /// value, with the row id breaking ties) and page window.
    pub fn build_sql(&self, spec: &QuerySpec) -> (String, Vec<Value>) {
        let mut params = vec![];
        let mut sql = format!("SELECT {} FROM \"{}\"", DOC_COLUMN, self.name);

        if !spec.filter.is_all() {
            sql.push_str(" WHERE ");
            sql.push_str(&spec.filter.to_sql(&mut params));
        }

        let mut orders = spec
            .sort
            .iter()
            .map(|key| {
                let direction = if key.is_desc() { "DESC" } else { "ASC" };
                let rank = TypeRank::new(&key.field).to_sql(&mut params);
                let value = JsonPath::new(&key.field).to_sql(&mut params);
                format!("{rank} {direction}, {value} {direction}")
            })
            .collect::<Vec<_>>();
        orders.push("id ASC".to_string());
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));

        match (spec.limit, spec.skip.filter(|&skip| skip > 0)) {
            (Some(limit), skip) => {
                sql.push_str(&format!(" LIMIT {}", clamp(limit)));
                if let Some(skip) = skip {
                    sql.push_str(&format!(" OFFSET {}", clamp(skip)));
                }
            }
            (None, Some(skip)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", clamp(skip))),
            (None, None) => {}
        }

        (sql, params)
    }

    /// Renders the COUNT for `spec`'s filter.
    pub fn build_count_sql(&self, spec: &QuerySpec) -> (String, Vec<Value>) {
        let mut params = vec![];
        let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", self.name);

        if !spec.filter.is_all() {
            sql.push_str(" WHERE ");
            sql.push_str(&spec.filter.to_sql(&mut params));
        }

        (sql, params)
    }
}

impl Collection for SqliteCollection {
    type Error = DbError;

    fn fetch(&self, spec: &QuerySpec) -> Result<Vec<Document>> {
        let (sql, params) = self.build_sql(spec);
        trace!(collection = %self.name, sql = %sql, "fetching documents");

        let conn = lock(&self.db)?;
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter()
            .map(|json| -> Result<Document> {
                let doc: Document = serde_json::from_str(json)?;
                Ok(spec.projection.apply(&doc))
            })
            .collect()
    }

    fn count(&self, spec: &QuerySpec) -> Result<u64> {
        let (sql, params) = self.build_count_sql(spec);
        trace!(collection = %self.name, sql = %sql, "counting documents");

        let conn = lock(&self.db)?;
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        let count: i64 = stmt.query_row(params_ref.as_slice(), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
