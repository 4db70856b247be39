//! JSON serialization helpers for outbound records.

use serde::Serialize;
use std::fmt;

/// Serialization failures, wrapped into `PublishError` by the sinks.
#[derive(Debug)]
pub enum SerializationError {
    JsonError(String),
}

impl SerializationError {
    pub fn json_error(message: &str, err: serde_json::Error) -> Self {
        SerializationError::JsonError(format!("{}: {}", message, err))
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::JsonError(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for SerializationError {}

/// Serialize a value to UTF-8 JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    serde_json::to_vec(value)
        .map_err(|e| SerializationError::json_error("Failed to serialize to JSON bytes", e))
}

/// Serialize a value to a JSON string.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    serde_json::to_string(value)
        .map_err(|e| SerializationError::json_error("Failed to serialize to JSON string", e))
}
