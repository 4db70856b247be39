//! Record Source: loads a delimited tabular file fully into memory as an
//! ordered, immutable sequence of rows.
//!
//! A [`Dataset`] is materialized once at startup and then shared read-only
//! (by `Arc`) across any number of concurrent emitters; nothing mutates it
//! after the load returns.

pub mod error;
pub mod loader;

pub use error::SourceLoadError;
pub use loader::{load_dataset, load_dataset_with, CsvSourceConfig};

use crate::replaystream::types::Row;
use std::sync::Arc;

/// An ordered, finite, fully materialized sequence of rows.
///
/// Invariant: every row has exactly the column set derived from the header,
/// in file order.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Arc<Vec<String>>,
    rows: Vec<Row>,
}

impl Dataset {
    pub(crate) fn new(columns: Arc<Vec<String>>, rows: Vec<Row>) -> Self {
        Dataset { columns, rows }
    }

    /// Column names in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}
