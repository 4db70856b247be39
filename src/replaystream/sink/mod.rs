//! Sink Adapter: abstracts "publish one record" over a Kafka topic or a live
//! push-stream connection.
//!
//! Both variants expose the same three operations (`connect`, `publish`,
//! `close`), so the emitter is written once against [`RecordSink`].

pub mod kafka;
pub mod sse;

pub use kafka::{KafkaSink, KafkaSinkConfig};
pub use sse::{SseSink, StreamFrame, END_OF_DATA};

use crate::replaystream::serialization::SerializationError;
use crate::replaystream::types::TimestampedRecord;
use async_trait::async_trait;
use rdkafka::error::KafkaError;
use std::fmt;

/// Why a sink is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Every row was emitted; the sink should signal end-of-stream if its
    /// protocol has a representation for it
    Exhausted,
    /// The consumer disconnected or the process is shutting down; release
    /// resources without an end marker
    Cancelled,
}

/// Errors raised by sink operations.
#[derive(Debug)]
pub enum PublishError {
    /// Underlying Kafka library error
    Kafka(KafkaError),
    /// Record could not be serialized
    Serialization(SerializationError),
    /// Sink-specific delivery failure
    Unreachable(String),
    /// The consumer closed its end of the stream
    Disconnected,
    /// `publish` called before `connect`
    NotConnected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Kafka(e) => write!(f, "Kafka error: {}", e),
            PublishError::Serialization(e) => write!(f, "Serialization error: {}", e),
            PublishError::Unreachable(msg) => write!(f, "Sink unreachable: {}", msg),
            PublishError::Disconnected => write!(f, "Consumer disconnected"),
            PublishError::NotConnected => write!(f, "Sink is not connected"),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Kafka(e) => Some(e),
            PublishError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KafkaError> for PublishError {
    fn from(err: KafkaError) -> Self {
        PublishError::Kafka(err)
    }
}

impl From<SerializationError> for PublishError {
    fn from(err: SerializationError) -> Self {
        PublishError::Serialization(err)
    }
}

/// One publish target for an emitter.
///
/// Lifecycle: `connect` once before the first publish, `publish` per record,
/// `close` exactly once with the reason the stream ended.
#[async_trait]
pub trait RecordSink: Send {
    /// Establish the connection or producer. Called once, before emission.
    async fn connect(&mut self) -> Result<(), PublishError>;

    /// Publish one record. A `Disconnected` error means the consumer is gone
    /// and the emitter must stop; other errors are subject to its
    /// failure policy.
    async fn publish(&mut self, record: &TimestampedRecord) -> Result<(), PublishError>;

    /// Release the sink. On `Exhausted` the sink emits its end-of-stream
    /// marker first, if it has one.
    async fn close(&mut self, reason: CloseReason) -> Result<(), PublishError>;
}
