//! CSV file backend
//!
//! Reads the whole file, and replaces it by writing a sibling temp file and
//! renaming it over the original, so readers never observe a half-written table.

use std::fs;
use std::path::{Path, PathBuf};

use super::backend::{BackendError, Row, TableBackend};
use crate::entities::case::columns;

/// A CSV file holding the case table
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(path: &Path, header: &[String], rows: &[Row]) -> Result<(), BackendError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(
                header
                    .iter()
                    .map(|column| row.get(column).map(String::as_str).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Known columns first, then any others in name order
    fn header_for(rows: &[Row]) -> Vec<String> {
        let mut header: Vec<String> = columns::ALL.iter().map(|c| c.to_string()).collect();
        let mut extra: Vec<&String> = rows
            .iter()
            .flat_map(|row| row.keys())
            .filter(|k| !columns::ALL.contains(&k.as_str()))
            .collect();
        extra.sort();
        extra.dedup();
        header.extend(extra.into_iter().cloned());
        header
    }
}

impl TableBackend for CsvTable {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        let header = Self::header_for(rows);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "cases.csv".to_string());
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, ulid::Ulid::new()));

        let written = Self::write_file(&tmp_path, &header, rows)
            .and_then(|()| fs::rename(&tmp_path, &self.path).map_err(BackendError::from));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
