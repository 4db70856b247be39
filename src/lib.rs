//! # replaystream
//!
//! A demo real-time analytics data plane: CSV datasets are loaded fully into
//! memory, replayed one row per fixed interval, optionally normalized
//! (imputation + range capping + min-max scaling), and published to a Kafka
//! topic or a Server-Sent-Events connection.
//!
//! ## Features
//!
//! - **Record Source**: RFC 4180-style CSV loading into an immutable,
//!   shareable [`Dataset`](replaystream::dataset::Dataset)
//! - **Normalizer**: pure per-row imputation and min-max scaling with
//!   explicit out-of-range capping policies
//! - **Emitter**: a timer-driven replay loop with strict per-record ordering,
//!   cooperative cancellation, and an explicit publish-failure policy
//! - **Sink Adapters**: Kafka (`rdkafka`) and Server-Sent-Events push
//!   streams behind one `connect`/`publish`/`close` trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use replaystream::{Emitter, SseSink, load_dataset};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Arc::new(load_dataset("data/smoke_detection_iot.csv")?);
//!     let (sink, mut rx) = SseSink::channel(16);
//!
//!     let emitter = Emitter::new("iot", dataset, sink);
//!     tokio::spawn(emitter.run(CancellationToken::new()));
//!
//!     while let Some(frame) = rx.recv().await {
//!         println!("{:?}", frame);
//!     }
//!     Ok(())
//! }
//! ```

pub mod replaystream;

// Re-export the main API at the crate root for easy access
pub use replaystream::config::{ConfigError, DatasetConfig, ReplayConfig, SinkKind};
pub use replaystream::dataset::{
    load_dataset, load_dataset_with, CsvSourceConfig, Dataset, SourceLoadError,
};
pub use replaystream::emitter::{
    ClockMode, EmissionCursor, Emitter, EmitterConfig, EmitterState, FailurePolicy,
};
pub use replaystream::normalize::{CapPolicy, FieldSpec, NormalizeError, Normalizer};
pub use replaystream::serialization::SerializationError;
pub use replaystream::sink::{
    CloseReason, KafkaSink, KafkaSinkConfig, PublishError, RecordSink, SseSink, StreamFrame,
};
pub use replaystream::types::{FieldValue, Row, TimestampedRecord};
