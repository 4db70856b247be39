//! Tests for the push-stream sink and its wire contract
//!
//! Covers: frame payloads including the UTC field, the end-of-stream
//! sentinel, disconnect detection, and a full emitter-to-frames run.

use chrono::{DateTime, Utc};
use replaystream::replaystream::dataset::load_dataset;
use replaystream::replaystream::emitter::{Emitter, EmitterConfig, EmitterState};
use replaystream::replaystream::sink::{CloseReason, PublishError, RecordSink, SseSink, StreamFrame, END_OF_DATA};
use replaystream::replaystream::types::{FieldValue, Row, TimestampedRecord};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

fn sample_record() -> TimestampedRecord {
    let columns = Arc::new(vec!["temperature".to_string()]);
    TimestampedRecord {
        index: 0,
        utc: DateTime::parse_from_rfc3339("2024-01-01T00:00:00.000Z")
            .unwrap()
            .with_timezone(&Utc),
        row: Row::new(columns, vec![FieldValue::String("21.5".to_string())]),
    }
}

#[tokio::test]
async fn test_publish_sends_json_frame_with_utc_field() {
    let (mut sink, mut rx) = SseSink::channel(4);

    sink.connect().await.unwrap();
    sink.publish(&sample_record()).await.unwrap();

    match rx.recv().await.unwrap() {
        StreamFrame::Data(json) => {
            assert_eq!(
                json,
                r#"{"temperature":"21.5","UTC":"2024-01-01T00:00:00.000Z"}"#
            );
        }
        other => panic!("expected a data frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_close_exhausted_sends_end_frame() {
    let (mut sink, mut rx) = SseSink::channel(4);

    sink.close(CloseReason::Exhausted).await.unwrap();
    assert_eq!(rx.recv().await, Some(StreamFrame::End));
    assert_eq!(END_OF_DATA, "End of data");
}

#[tokio::test]
async fn test_close_cancelled_sends_nothing() {
    let (mut sink, mut rx) = SseSink::channel(4);

    sink.close(CloseReason::Cancelled).await.unwrap();
    drop(sink);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_dropped_receiver_reports_disconnect() {
    let (mut sink, rx) = SseSink::channel(4);
    drop(rx);

    assert!(matches!(
        sink.connect().await,
        Err(PublishError::Disconnected)
    ));
    assert!(matches!(
        sink.publish(&sample_record()).await,
        Err(PublishError::Disconnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_emitter_delivers_frames_then_end() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "temperature").unwrap();
    for value in ["20.0", "21.0", "22.0"] {
        writeln!(file, "{}", value).unwrap();
    }
    file.flush().unwrap();
    let dataset = Arc::new(load_dataset(file.path()).unwrap());

    let (sink, mut rx) = SseSink::channel(8);
    let config = EmitterConfig {
        interval: Duration::from_millis(10),
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset, sink).with_config(config);
    let handle = tokio::spawn(emitter.run(CancellationToken::new()));

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 4);
    for (i, frame) in frames.iter().take(3).enumerate() {
        match frame {
            StreamFrame::Data(json) => {
                let value: serde_json::Value = serde_json::from_str(json).unwrap();
                assert_eq!(value["temperature"], format!("{}.0", 20 + i));
                assert!(value["UTC"].is_string());
            }
            other => panic!("expected a data frame, got {:?}", other),
        }
    }
    assert_eq!(frames[3], StreamFrame::End);
    assert_eq!(handle.await.unwrap(), EmitterState::Exhausted);
}
