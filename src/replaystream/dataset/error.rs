//! Record Source error types

use std::fmt;

/// Errors raised while loading a dataset file.
///
/// All of these are fatal for the dataset being loaded: no partial dataset is
/// ever served. Other datasets continue loading independently.
#[derive(Debug)]
pub enum SourceLoadError {
    /// File not found or inaccessible
    FileNotFound(String),

    /// File contains no header row
    EmptyFile(String),

    /// Header declares the same column twice
    DuplicateColumn(String),

    /// A line could not be parsed as CSV
    CsvParse { line: usize, message: String },

    /// A data row does not match the header's column count
    RowWidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// IO error
    Io(String),
}

impl fmt::Display for SourceLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLoadError::FileNotFound(path) => {
                write!(f, "File not found: {}", path)
            }
            SourceLoadError::EmptyFile(path) => {
                write!(f, "File has no header row: {}", path)
            }
            SourceLoadError::DuplicateColumn(name) => {
                write!(f, "Duplicate column in header: {}", name)
            }
            SourceLoadError::CsvParse { line, message } => {
                write!(f, "CSV parsing error at line {}: {}", line, message)
            }
            SourceLoadError::RowWidthMismatch {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Row at line {} has {} fields, header has {}",
                    line, found, expected
                )
            }
            SourceLoadError::Io(msg) => {
                write!(f, "IO error: {}", msg)
            }
        }
    }
}

impl std::error::Error for SourceLoadError {}

impl From<std::io::Error> for SourceLoadError {
    fn from(err: std::io::Error) -> Self {
        SourceLoadError::Io(err.to_string())
    }
}
