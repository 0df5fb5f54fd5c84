//! External table abstraction
//!
//! The table offers exactly two operations: read every row, or replace every
//! row. There is no row-level update, no version column and no transaction id.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use crate::entities::case::columns;

/// One table row: column name to cell value
pub type Row = BTreeMap<String, String>;

/// Failures reported by a table backend; all of them are treated as transient
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("table unavailable: {0}")]
    Unavailable(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Whole-snapshot table access
pub trait TableBackend: Send + Sync {
    fn read_all(&self) -> Result<Vec<Row>, BackendError>;

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError>;

    /// Short human-readable description for logs
    fn describe(&self) -> String {
        "table".to_string()
    }
}

impl<T: TableBackend + ?Sized> TableBackend for std::sync::Arc<T> {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        (**self).read_all()
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        (**self).write_all(rows)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// The full ordered contents of the table at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    rows: Vec<Row>,
}

impl Snapshot {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Index of the first row whose id cell equals `case_id`
    pub fn position_of(&self, case_id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row_id(row) == Some(case_id))
    }

    pub fn contains_id(&self, case_id: &str) -> bool {
        self.position_of(case_id).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Replace the row at `index` in place, keeping table order
    pub fn replace(&mut self, index: usize, row: Row) -> Option<Row> {
        let slot = self.rows.get_mut(index)?;
        Some(std::mem::replace(slot, row))
    }

    /// Case ids that appear on more than one row
    pub fn duplicate_ids(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for id in self.rows.iter().filter_map(row_id) {
            if !seen.insert(id) {
                duplicates.insert(id.to_string());
            }
        }
        duplicates
    }

    /// SHA-256 over every cell, used to notice a table that changed under us
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.rows {
            for (key, value) in row {
                hasher.update((key.len() as u64).to_le_bytes());
                hasher.update(key.as_bytes());
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
            hasher.update([0xff]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Trimmed case id of a row, if it has one
pub fn row_id(row: &Row) -> Option<&str> {
    row.get(columns::REPORT_ID)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// In-process table, mainly for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<Row>>,
    writes: AtomicUsize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `write_all` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl TableBackend for MemoryTable {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| BackendError::Unavailable("memory table lock poisoned".to_string()))?;
        Ok(rows.clone())
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|_| BackendError::Unavailable("memory table lock poisoned".to_string()))?;
        *guard = rows.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
