//! Kafka broker sink built on rdkafka's `FutureProducer`.

use super::{CloseReason, PublishError, RecordSink};
use crate::replaystream::serialization::to_json;
use crate::replaystream::types::TimestampedRecord;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;

const SEND_WAIT_SECS: u64 = 30;
const FLUSH_WAIT_SECS: u64 = 5;

/// Configuration for a [`KafkaSink`].
#[derive(Debug, Clone)]
pub struct KafkaSinkConfig {
    /// Comma-separated broker addresses, e.g. `localhost:9092`
    pub brokers: String,
    /// Topic every record is published to
    pub topic: String,
    /// Payload to publish once the dataset is exhausted. Off by default:
    /// the broker side has no end-of-stream representation and the topic
    /// simply stops receiving messages.
    pub end_marker: Option<String>,
    /// rdkafka `message.timeout.ms`
    pub message_timeout_ms: u64,
}

impl KafkaSinkConfig {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        KafkaSinkConfig {
            brokers: brokers.into(),
            topic: topic.into(),
            end_marker: None,
            message_timeout_ms: 5000,
        }
    }

    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = Some(marker.into());
        self
    }
}

/// Publishes JSON-serialized records onto a named topic.
pub struct KafkaSink {
    config: KafkaSinkConfig,
    producer: Option<FutureProducer>,
}

impl KafkaSink {
    pub fn new(config: KafkaSinkConfig) -> Self {
        KafkaSink {
            config,
            producer: None,
        }
    }

    pub fn config(&self) -> &KafkaSinkConfig {
        &self.config
    }

    async fn send_payload(
        &self,
        payload: &[u8],
        timestamp: Option<i64>,
    ) -> Result<(), PublishError> {
        let producer = self.producer.as_ref().ok_or(PublishError::NotConnected)?;

        let mut record = FutureRecord::to(&self.config.topic).payload(payload).key("");
        if let Some(ts) = timestamp {
            record = record.timestamp(ts);
        }

        match producer
            .send(record, Timeout::After(Duration::from_secs(SEND_WAIT_SECS)))
            .await
        {
            Ok(_) => Ok(()),
            Err((err, _)) => {
                error!(
                    "failed to send message to topic '{}': {}",
                    self.config.topic, err
                );
                Err(PublishError::Kafka(err))
            }
        }
    }
}

#[async_trait]
impl RecordSink for KafkaSink {
    async fn connect(&mut self) -> Result<(), PublishError> {
        if self.config.topic.is_empty() {
            return Err(PublishError::Unreachable(
                "no topic configured".to_string(),
            ));
        }

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set(
                "message.timeout.ms",
                self.config.message_timeout_ms.to_string(),
            )
            .create()?;

        info!(
            "created Kafka producer for {} with topic '{}'",
            self.config.brokers, self.config.topic
        );
        self.producer = Some(producer);
        Ok(())
    }

    async fn publish(&mut self, record: &TimestampedRecord) -> Result<(), PublishError> {
        let payload = to_json(record)?;
        self.send_payload(&payload, Some(record.utc.timestamp_millis()))
            .await?;
        debug!(
            "sent record {} to topic '{}'",
            record.index, self.config.topic
        );
        Ok(())
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), PublishError> {
        if reason == CloseReason::Exhausted {
            if let Some(marker) = self.config.end_marker.clone() {
                self.send_payload(marker.as_bytes(), None).await?;
            }
        }
        if let Some(producer) = self.producer.take() {
            if let Err(e) = producer.flush(Timeout::After(Duration::from_secs(FLUSH_WAIT_SECS))) {
                warn!("failed to flush producer for '{}': {}", self.config.topic, e);
            }
        }
        info!("Kafka sink for topic '{}' closed ({:?})", self.config.topic, reason);
        Ok(())
    }
}
