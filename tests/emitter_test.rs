//! Tests for the emitter state machine
//!
//! Covers: full-run ordering and the terminal marker, replay-clock
//! timestamps, the empty dataset, cancellation, consumer disconnect, and the
//! three publish-failure policies.

use async_trait::async_trait;
use replaystream::replaystream::dataset::{load_dataset, Dataset};
use replaystream::replaystream::emitter::{
    ClockMode, Emitter, EmitterConfig, EmitterState, FailurePolicy,
};
use replaystream::replaystream::sink::{CloseReason, PublishError, RecordSink};
use replaystream::replaystream::types::TimestampedRecord;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

/// Records every publish attempt; optionally fails the first N publishes or
/// reports a disconnect once a number of records got through.
#[derive(Clone, Default)]
struct MockSink {
    records: Arc<Mutex<Vec<TimestampedRecord>>>,
    closes: Arc<Mutex<Vec<CloseReason>>>,
    attempts: Arc<Mutex<usize>>,
    fail_next: Arc<Mutex<usize>>,
    disconnect_after: Option<usize>,
}

impl MockSink {
    fn failing_first(n: usize) -> Self {
        let sink = MockSink::default();
        *sink.fail_next.lock().unwrap() = n;
        sink
    }

    fn disconnecting_after(n: usize) -> Self {
        MockSink {
            disconnect_after: Some(n),
            ..MockSink::default()
        }
    }

    fn records(&self) -> Vec<TimestampedRecord> {
        self.records.lock().unwrap().clone()
    }

    fn closes(&self) -> Vec<CloseReason> {
        self.closes.lock().unwrap().clone()
    }

    fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl RecordSink for MockSink {
    async fn connect(&mut self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&mut self, record: &TimestampedRecord) -> Result<(), PublishError> {
        *self.attempts.lock().unwrap() += 1;
        if let Some(n) = self.disconnect_after {
            if self.records.lock().unwrap().len() >= n {
                return Err(PublishError::Disconnected);
            }
        }
        {
            let mut fail_next = self.fail_next.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(PublishError::Unreachable("mock sink down".to_string()));
            }
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), PublishError> {
        self.closes.lock().unwrap().push(reason);
        Ok(())
    }
}

fn dataset_of(rows: usize) -> Arc<Dataset> {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "temperature,device").unwrap();
    for i in 0..rows {
        writeln!(file, "{},sensor-{}", 20 + i, i).unwrap();
    }
    file.flush().unwrap();
    Arc::new(load_dataset(file.path()).unwrap())
}

fn fast_config() -> EmitterConfig {
    EmitterConfig {
        interval: Duration::from_millis(10),
        ..EmitterConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_run_emits_all_records_in_order() {
    let sink = MockSink::default();
    let emitter = Emitter::new("test", dataset_of(5), sink.clone()).with_config(fast_config());

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Exhausted);
    let records = sink.records();
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.index, i);
    }
    // Exactly one terminal marker, delivered through close(Exhausted)
    assert_eq!(sink.closes(), vec![CloseReason::Exhausted]);
}

#[tokio::test(start_paused = true)]
async fn test_replay_clock_timestamps_step_by_interval() {
    let sink = MockSink::default();
    let config = EmitterConfig {
        interval: Duration::from_millis(100),
        clock: ClockMode::Replay,
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset_of(4), sink.clone()).with_config(config);

    emitter.run(CancellationToken::new()).await;

    let records = sink.records();
    for (i, record) in records.iter().enumerate() {
        let delta = record.utc - records[0].utc;
        assert_eq!(delta, chrono::Duration::milliseconds(i as i64 * 100));
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_dataset_goes_straight_to_exhausted() {
    let sink = MockSink::default();
    let emitter = Emitter::new("test", dataset_of(0), sink.clone()).with_config(fast_config());

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Exhausted);
    assert!(sink.records().is_empty());
    assert_eq!(sink.closes(), vec![CloseReason::Exhausted]);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_token_stops_before_any_emission() {
    let sink = MockSink::default();
    let emitter = Emitter::new("test", dataset_of(5), sink.clone()).with_config(fast_config());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let state = emitter.run(cancel).await;

    assert_eq!(state, EmitterState::Cancelled);
    assert!(sink.records().is_empty());
    assert_eq!(sink.closes(), vec![CloseReason::Cancelled]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_run_stops_emission() {
    let sink = MockSink::default();
    let config = EmitterConfig {
        interval: Duration::from_millis(100),
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset_of(50), sink.clone()).with_config(config);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(emitter.run(cancel.clone()));

    // Ticks land at 0ms, 100ms, and 200ms before the cancel at 250ms.
    tokio::time::sleep(Duration::from_millis(250)).await;
    cancel.cancel();
    let state = handle.await.unwrap();

    assert_eq!(state, EmitterState::Cancelled);
    let emitted = sink.records().len();
    assert_eq!(emitted, 3);
    assert_eq!(sink.closes(), vec![CloseReason::Cancelled]);

    // No stray timer keeps publishing after the emitter is gone.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.records().len(), emitted);
}

#[tokio::test(start_paused = true)]
async fn test_consumer_disconnect_cancels_without_end_marker() {
    let sink = MockSink::disconnecting_after(2);
    let emitter = Emitter::new("test", dataset_of(5), sink.clone()).with_config(fast_config());

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Cancelled);
    assert_eq!(sink.records().len(), 2);
    assert_eq!(sink.attempts(), 3);
    assert_eq!(sink.closes(), vec![CloseReason::Cancelled]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_policy_does_not_advance_the_cursor() {
    let sink = MockSink::failing_first(1);
    let config = EmitterConfig {
        interval: Duration::from_millis(10),
        failure_policy: FailurePolicy::Retry,
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset_of(2), sink.clone()).with_config(config);

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Exhausted);
    let records = sink.records();
    // The failed record was retried, not lost
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].index, 0);
    assert_eq!(records[1].index, 1);
    assert_eq!(sink.attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_advances_past_the_failure() {
    let sink = MockSink::failing_first(1);
    let config = EmitterConfig {
        interval: Duration::from_millis(10),
        failure_policy: FailurePolicy::Skip,
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset_of(2), sink.clone()).with_config(config);

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Exhausted);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
    assert_eq!(sink.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_policy_stops_on_first_failure() {
    let sink = MockSink::failing_first(1);
    let config = EmitterConfig {
        interval: Duration::from_millis(10),
        failure_policy: FailurePolicy::Cancel,
        ..EmitterConfig::default()
    };
    let emitter = Emitter::new("test", dataset_of(2), sink.clone()).with_config(config);

    let state = emitter.run(CancellationToken::new()).await;

    assert_eq!(state, EmitterState::Cancelled);
    assert!(sink.records().is_empty());
    assert_eq!(sink.closes(), vec![CloseReason::Cancelled]);
}
