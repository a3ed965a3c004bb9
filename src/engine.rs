use crate::errors::{AppError, AppResult};
use crate::models::{ColumnInfo, QueryResult};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Execution collaborator contract: the controller only ever talks to the
/// engine through this seam.
pub trait QueryEngine: Send + Sync {
    fn execute_query(&self, sql: &str) -> AppResult<QueryResult>;
    fn loaded_tables(&self) -> AppResult<Vec<String>>;
    fn table_schema(&self, table: &str) -> AppResult<Vec<ColumnInfo>>;
}

#[derive(Debug)]
pub struct SqliteEngine {
    conn: Mutex<Connection>,
}

impl SqliteEngine {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs several statements at once; used to seed datasets.
    pub fn execute_batch(&self, sql: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("engine mutex poisoned".to_string()))
    }
}

impl QueryEngine for SqliteEngine {
    fn execute_query(&self, sql: &str) -> AppResult<QueryResult> {
        let started = Instant::now();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let column_count = columns.len();

        let mut collected: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for index in 0..column_count {
                cells.push(cell_to_json(row.get_ref(index)?));
            }
            collected.push(cells);
        }

        let row_count = collected.len() as u64;
        Ok(QueryResult {
            columns,
            rows: collected,
            row_count,
            execution_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn loaded_tables(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_schema(&self, table: &str) -> AppResult<Vec<ColumnInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(AppError::NotFound(format!("No table named {table}")));
        }
        Ok(columns)
    }
}

fn cell_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(int) => serde_json::Value::from(int),
        ValueRef::Real(real) => serde_json::Value::from(real),
        ValueRef::Text(text) => serde_json::Value::from(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::from(BASE64_STANDARD.encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryEngine, SqliteEngine};
    use crate::errors::AppError;
    use serde_json::json;

    fn seeded_engine() -> SqliteEngine {
        let engine = SqliteEngine::in_memory().expect("in-memory engine");
        engine
            .execute_batch(
                "CREATE TABLE county_budget (department TEXT, fiscal_year INTEGER, amount REAL);
                 INSERT INTO county_budget VALUES
                   ('Schools', 2024, 1500000.0),
                   ('Public Safety', 2024, 800000.5),
                   ('Schools', 2023, NULL);",
            )
            .expect("seed");
        engine
    }

    #[test]
    fn executes_a_select_with_typed_cells() {
        let engine = seeded_engine();
        let result = engine
            .execute_query("SELECT department, fiscal_year, amount FROM county_budget ORDER BY department, fiscal_year")
            .expect("query");

        assert_eq!(result.columns, vec!["department", "fiscal_year", "amount"]);
        assert_eq!(result.row_count, 3);
        assert_eq!(result.rows[0], vec![json!("Public Safety"), json!(2024), json!(800000.5)]);
        assert_eq!(result.rows[1][2], json!(null));
    }

    #[test]
    fn ddl_statements_return_an_empty_grid() {
        let engine = SqliteEngine::in_memory().expect("engine");
        let result = engine
            .execute_query("CREATE TABLE t (x INTEGER)")
            .expect("ddl");
        assert!(result.columns.is_empty());
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn syntax_errors_surface_as_query_failures() {
        let engine = seeded_engine();
        let err = engine
            .execute_query("SELEC department FROM county_budget")
            .expect_err("invalid sql");
        assert!(matches!(err, AppError::Query(_)));
    }

    #[test]
    fn lists_tables_and_schemas() {
        let engine = seeded_engine();
        assert_eq!(engine.loaded_tables().expect("tables"), vec!["county_budget"]);

        let schema = engine.table_schema("county_budget").expect("schema");
        assert_eq!(schema.len(), 3);
        assert_eq!(schema[0].name, "department");
        assert_eq!(schema[0].data_type, "TEXT");

        let missing = engine.table_schema("nope").expect_err("missing table");
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
