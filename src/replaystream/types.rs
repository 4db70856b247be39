//! Core record types shared across the pipeline.
//!
//! A [`Row`] is an ordered mapping from column name to [`FieldValue`]; the
//! column list comes from the CSV header and is shared across every row of
//! one load. Rows are immutable once produced; transformations return a new
//! `Row` over the same column list.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;

/// A single field value as it moves through the pipeline.
///
/// The loader produces `String` for every populated cell and `Null` for empty
/// cells; the normalizer replaces designated numeric fields with `Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw text value as parsed from the source file
    String(String),
    /// Numeric value produced by normalization
    Float(f64),
    /// Empty cell
    Null,
}

impl FieldValue {
    /// Interpret this value as a finite number, if possible.
    ///
    /// Returns `None` for empty cells and for text that does not parse as a
    /// finite float; callers treat both the same way as "missing".
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f).filter(|f| f.is_finite()),
            FieldValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            FieldValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Null => serializer.serialize_none(),
        }
    }
}

/// One record of a dataset: column names zipped with values.
///
/// The column list is `Arc`-shared with the owning dataset, so cloning a row
/// never copies the header. Serializes as a JSON object in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<FieldValue>,
}

impl Row {
    /// Build a row over a shared column list. `values` must have one entry
    /// per column.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter())
    }

    /// Produce a new row over the same column list with replaced values.
    pub fn with_values(&self, values: Vec<FieldValue>) -> Row {
        debug_assert_eq!(self.columns.len(), values.len());
        Row {
            columns: Arc::clone(&self.columns),
            values,
        }
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A row stamped with its synthetic emission timestamp.
///
/// Created by the emitter at publish time and never mutated afterwards.
/// Serializes as the row's fields followed by a `"UTC"` field carrying the
/// timestamp in ISO-8601 with millisecond precision.
#[derive(Debug, Clone)]
pub struct TimestampedRecord {
    /// Position of the row in its dataset
    pub index: usize,
    /// Synthetic emission timestamp
    pub utc: DateTime<Utc>,
    /// The (possibly normalized) row
    pub row: Row,
}

impl TimestampedRecord {
    /// The timestamp formatted the way it appears on the wire,
    /// e.g. `2024-01-01T00:00:03.000Z`.
    pub fn utc_string(&self) -> String {
        self.utc.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl Serialize for TimestampedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.row.len() + 1))?;
        for (name, value) in self.row.iter() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("UTC", &self.utc_string())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        let columns = Arc::new(vec!["temperature".to_string(), "device".to_string()]);
        Row::new(
            columns,
            vec![
                FieldValue::String("21.5".to_string()),
                FieldValue::String("sensor-1".to_string()),
            ],
        )
    }

    #[test]
    fn test_as_numeric() {
        assert_eq!(FieldValue::String("21.5".to_string()).as_numeric(), Some(21.5));
        assert_eq!(FieldValue::String(" 7 ".to_string()).as_numeric(), Some(7.0));
        assert_eq!(FieldValue::String("n/a".to_string()).as_numeric(), None);
        assert_eq!(FieldValue::String("NaN".to_string()).as_numeric(), None);
        assert_eq!(FieldValue::Float(0.25).as_numeric(), Some(0.25));
        assert_eq!(FieldValue::Null.as_numeric(), None);
    }

    #[test]
    fn test_row_lookup_preserves_order() {
        let row = sample_row();
        assert_eq!(row.columns(), &["temperature", "device"]);
        assert_eq!(
            row.get("device"),
            Some(&FieldValue::String("sensor-1".to_string()))
        );
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = sample_row();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"temperature":"21.5","device":"sensor-1"}"#);
    }

    #[test]
    fn test_timestamped_record_appends_utc_field() {
        let record = TimestampedRecord {
            index: 0,
            utc: DateTime::parse_from_rfc3339("2024-01-01T00:00:03.000Z")
                .unwrap()
                .with_timezone(&Utc),
            row: sample_row(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"temperature":"21.5","device":"sensor-1","UTC":"2024-01-01T00:00:03.000Z"}"#
        );
    }
}
