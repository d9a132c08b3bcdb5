//! CSV and JSON data files for data-driven actions.
//!
//! Dataset files (users, issues, pages, ...) are plain headerless CSV: one
//! record per line, fields in a fixed order known to the action that reads
//! them.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading data files.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Failed to read CSV file: {0}")]
    CsvReadError(#[from] csv::Error),

    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Data file is empty: {0}")]
    EmptyData(String),
}

/// One CSV record as its fields, in file order.
pub type DataRow = Vec<String>;

/// Read every row of a headerless CSV file.
///
/// Rows keep file order; rows may have different numbers of fields.
pub fn read_input_file<P: AsRef<Path>>(path: P) -> Result<Vec<DataRow>, DataSourceError> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)?;
    let rows = read_csv_rows(file)?;

    debug!(path = ?path_ref, rows = rows.len(), "CSV data file read");

    Ok(rows)
}

/// Read headerless CSV rows from any reader.
pub fn read_csv_rows<R: std::io::Read>(reader: R) -> Result<Vec<DataRow>, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(rows)
}

/// Parse a JSON file into a generic value.
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Value, DataSourceError> {
    read_json_as(path)
}

/// Parse a JSON file into a typed structure.
pub fn read_json_as<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, DataSourceError> {
    let file = File::open(path.as_ref())?;
    let value = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(value)
}

/// A loaded dataset shared by all virtual users.
///
/// Rows are read-only after loading; handing out rows round-robin only
/// touches an atomic cursor.
///
/// # Example
/// ```rust,no_run
/// use dc_loadtest::data_source::Dataset;
///
/// let users = Dataset::from_file("datasets/users.csv").unwrap();
/// let row = users.next_row();
/// println!("login as {}", row[0]);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Arc<Vec<DataRow>>,
    cursor: Arc<AtomicUsize>,
}

impl Dataset {
    /// Load a dataset; an empty file is an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DataSourceError> {
        let path_ref = path.as_ref();
        let rows = read_input_file(path_ref)?;
        let dataset = Self::from_rows(rows)
            .ok_or_else(|| DataSourceError::EmptyData(path_ref.display().to_string()))?;

        info!(path = ?path_ref, rows = dataset.len(), "Dataset loaded");

        Ok(dataset)
    }

    /// Wrap already-loaded rows; `None` when there are none.
    pub fn from_rows(rows: Vec<DataRow>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        Some(Self {
            rows: Arc::new(rows),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Next row in round-robin order, wrapping after the last one.
    pub fn next_row(&self) -> &DataRow {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.rows[index % self.rows.len()]
    }

    /// A uniformly random row.
    pub fn random_row(&self) -> &DataRow {
        // from_rows guarantees at least one row
        self.rows
            .choose(&mut rand::thread_rng())
            .unwrap_or(&self.rows[0])
    }

    pub fn get(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
