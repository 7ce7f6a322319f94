use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::AskError;

/// Upper bound on rows returned to the caller
pub const MAX_ROWS: usize = 1000;

/// Runs generated SQL against the relational data database.
///
/// The connection is opened read-only, so statements that would write fail
/// instead of touching the data.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    path: PathBuf,
}

impl SqlExecutor {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Execute `sql` and return each row as a JSON object keyed by column name
    pub async fn execute(&self, sql: &str) -> Result<Vec<Value>, AskError> {
        let path = self.path.clone();
        let owned_sql = sql.to_string();

        let rows = tokio::task::spawn_blocking(move || run_query(&path, &owned_sql))
            .await
            .map_err(|e| execution_error(sql, e))?
            .map_err(|e| execution_error(sql, e))?;

        info!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

fn execution_error(sql: &str, error: impl std::fmt::Display) -> AskError {
    AskError::Execution {
        message: error.to_string(),
        sql: sql.to_string(),
    }
}

fn run_query(path: &Path, sql: &str) -> rusqlite::Result<Vec<Value>> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(sql)?;

    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        if out.len() >= MAX_ROWS {
            debug!("Row limit {} reached, truncating result", MAX_ROWS);
            break;
        }
        let mut object = Map::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            object.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(Value::Object(object));
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
