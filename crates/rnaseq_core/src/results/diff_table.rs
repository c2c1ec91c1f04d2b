//! Tab-separated differential expression table, keyed by `test_id`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// File read when a directory is given.
pub const DEFAULT_TABLE: &str = "isoform_exp.diff";

const INDEX_COLUMN: &str = "test_id";

#[derive(Error, Debug)]
pub enum ResultTableError {
    #[error("Cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no 'test_id' column", path.display())]
    MissingIndexColumn { path: PathBuf },
}

pub type ResultTableResult<T> = Result<T, ResultTableError>;

/// One decoded cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    fn parse(raw: &str) -> Self {
        match raw {
            "yes" => Value::Bool(true),
            "no" => Value::Bool(false),
            _ => raw
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Rows keyed by test id, columns in file order (index column excluded).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffTable {
    pub columns: Vec<String>,
    pub rows: BTreeMap<String, Vec<Value>>,
}

impl DiffTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, test_id: &str, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(test_id)?.get(idx)
    }

    /// Number of rows whose `significant` column is `yes`.
    pub fn significant_count(&self) -> usize {
        self.rows
            .keys()
            .filter(|id| self.get(id, "significant").and_then(Value::as_bool) == Some(true))
            .count()
    }
}

/// Load a table file, or `isoform_exp.diff` inside a directory.
///
/// `log2(fold_change)` is renamed `fold_change`.
pub fn load_diff_table(path: impl AsRef<Path>) -> ResultTableResult<DiffTable> {
    let path = path.as_ref();
    let path = if path.is_dir() {
        path.join(DEFAULT_TABLE)
    } else {
        path.to_path_buf()
    };

    let file = File::open(&path).map_err(|source| ResultTableError::Io {
        path: path.clone(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(file);

    let csv_err = |source: csv::Error| ResultTableError::Csv {
        path: path.clone(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let index = headers
        .iter()
        .position(|h| h == INDEX_COLUMN)
        .ok_or_else(|| ResultTableError::MissingIndexColumn { path: path.clone() })?;

    let columns = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, h)| match h {
            "log2(fold_change)" => "fold_change".to_string(),
            other => other.to_string(),
        })
        .collect();

    let mut rows = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let key = record.get(index).unwrap_or_default().to_string();
        let values = record
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, raw)| Value::parse(raw))
            .collect();
        rows.insert(key, values);
    }

    tracing::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(DiffTable { columns, rows })
}
