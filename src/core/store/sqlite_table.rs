//! SQLite file backend
//!
//! Stores each row as a JSON object keyed by position. Writes delete and
//! re-insert every row inside one transaction; the connection is opened per
//! call, like a remote table client would.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::backend::{BackendError, Row, TableBackend};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS case_rows (
    position INTEGER PRIMARY KEY,
    row_json TEXT NOT NULL
);
";

/// A SQLite database holding the case table
#[derive(Debug, Clone)]
pub struct SqliteTable {
    path: PathBuf,
}

impl SqliteTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, BackendError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }
}

impl TableBackend for SqliteTable {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT row_json FROM case_rows ORDER BY position")?;
        let encoded = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        encoded
            .iter()
            .map(|json| serde_json::from_str::<Row>(json).map_err(BackendError::from))
            .collect()
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM case_rows", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO case_rows (position, row_json) VALUES (?1, ?2)")?;
            for (position, row) in rows.iter().enumerate() {
                let json = serde_json::to_string(row)?;
                insert.execute(params![position as i64, json])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
