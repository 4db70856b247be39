//! Push-stream sink: frames handed over a bounded channel to the HTTP layer,
//! which renders them as Server-Sent Events.

use super::{CloseReason, PublishError, RecordSink};
use crate::replaystream::serialization::to_json_string;
use crate::replaystream::types::TimestampedRecord;
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

/// Payload of the terminal frame, `data: End of data`.
pub const END_OF_DATA: &str = "End of data";

/// Default capacity of the frame channel between an emitter and its
/// connection handler.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// One frame of a push stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A JSON-serialized record
    Data(String),
    /// End-of-stream marker; the connection closes after this frame
    End,
}

/// Sink end of a live push-stream connection.
///
/// `publish` blocks while the channel is full, which paces the emitter
/// rather than buffering unboundedly. A dropped receiver (the consumer
/// closed the connection) surfaces as [`PublishError::Disconnected`].
pub struct SseSink {
    tx: mpsc::Sender<StreamFrame>,
}

impl SseSink {
    /// Create a sink and the frame receiver for the connection handler.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (SseSink { tx }, rx)
    }
}

#[async_trait]
impl RecordSink for SseSink {
    async fn connect(&mut self) -> Result<(), PublishError> {
        if self.tx.is_closed() {
            return Err(PublishError::Disconnected);
        }
        Ok(())
    }

    async fn publish(&mut self, record: &TimestampedRecord) -> Result<(), PublishError> {
        let json = to_json_string(record)?;
        self.tx
            .send(StreamFrame::Data(json))
            .await
            .map_err(|_| PublishError::Disconnected)
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), PublishError> {
        if reason == CloseReason::Exhausted {
            // Best effort: the consumer may already be gone.
            if self.tx.send(StreamFrame::End).await.is_err() {
                debug!("consumer went away before the end-of-stream frame");
            }
        }
        Ok(())
    }
}
