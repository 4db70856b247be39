//! CSV loading into an in-memory [`Dataset`]

use super::error::SourceLoadError;
use super::Dataset;
use crate::replaystream::types::{FieldValue, Row};
use log::info;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Parsing options for CSV sources.
#[derive(Debug, Clone)]
pub struct CsvSourceConfig {
    /// Field delimiter character
    pub delimiter: char,
    /// Quote character
    pub quote: char,
    /// Trim surrounding whitespace from every field
    pub trim_fields: bool,
}

impl Default for CsvSourceConfig {
    fn default() -> Self {
        CsvSourceConfig {
            delimiter: ',',
            quote: '"',
            trim_fields: true,
        }
    }
}

/// Load a comma-separated file with a header row into a [`Dataset`].
///
/// Reads the file end-to-end and returns with no retained handle. Fails if
/// the file is missing or malformed; a header-only file yields a valid
/// zero-row dataset.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, SourceLoadError> {
    load_dataset_with(path, &CsvSourceConfig::default())
}

/// Load a delimited file with explicit parsing options.
pub fn load_dataset_with(
    path: impl AsRef<Path>,
    config: &CsvSourceConfig,
) -> Result<Dataset, SourceLoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceLoadError::FileNotFound(display.clone()),
        _ => SourceLoadError::Io(e.to_string()),
    })?;
    let reader = BufReader::new(file);

    let mut columns: Option<Arc<Vec<String>>> = None;
    let mut rows = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields = parse_csv_fields(&line, config).map_err(|message| {
            SourceLoadError::CsvParse {
                line: line_idx + 1,
                message,
            }
        })?;

        match &columns {
            None => {
                let mut seen = HashSet::new();
                for name in &fields {
                    if !seen.insert(name.clone()) {
                        return Err(SourceLoadError::DuplicateColumn(name.clone()));
                    }
                }
                columns = Some(Arc::new(fields));
            }
            Some(cols) => {
                if fields.len() != cols.len() {
                    return Err(SourceLoadError::RowWidthMismatch {
                        line: line_idx + 1,
                        expected: cols.len(),
                        found: fields.len(),
                    });
                }
                let values = fields
                    .into_iter()
                    .map(|f| {
                        if f.is_empty() {
                            FieldValue::Null
                        } else {
                            FieldValue::String(f)
                        }
                    })
                    .collect();
                rows.push(Row::new(Arc::clone(cols), values));
            }
        }
    }

    let columns = columns.ok_or(SourceLoadError::EmptyFile(display.clone()))?;
    info!(
        "loaded {} rows ({} columns) from {}",
        rows.len(),
        columns.len(),
        display
    );
    Ok(Dataset::new(columns, rows))
}

/// RFC 4180 style CSV field parsing: quoted fields may contain the delimiter,
/// a doubled quote inside a quoted field is a literal quote.
fn parse_csv_fields(line: &str, config: &CsvSourceConfig) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c == config.quote => {
                if in_quotes {
                    if chars.peek() == Some(&config.quote) {
                        current_field.push(config.quote);
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == config.delimiter && !in_quotes => {
                fields.push(finish_field(current_field, config));
                current_field = String::new();
            }
            c => {
                current_field.push(c);
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }

    fields.push(finish_field(current_field, config));
    Ok(fields)
}

fn finish_field(field: String, config: &CsvSourceConfig) -> String {
    if config.trim_fields {
        field.trim().to_string()
    } else {
        field
    }
}
