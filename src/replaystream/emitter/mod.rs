//! Emitter: the timer-driven replay loop.
//!
//! One emitter owns one sink and one [`EmissionCursor`]; the dataset is
//! shared read-only. Each tick publishes at most one record, and the next
//! tick is not processed until the in-flight publish settles, so ticks never
//! overlap and records leave in strictly increasing index order.

use crate::replaystream::dataset::Dataset;
use crate::replaystream::normalize::Normalizer;
use crate::replaystream::sink::{CloseReason, PublishError, RecordSink};
use crate::replaystream::types::TimestampedRecord;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default emission interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 3000;

/// Lifecycle of one emitter instance.
///
/// `Idle → Running → (Exhausted | Cancelled)`; the two right-hand states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Dataset loaded, no timer armed
    Idle,
    /// Timer armed, emitting one record per tick
    Running,
    /// All rows sent and the end-of-stream marker delivered
    Exhausted,
    /// Consumer disconnected or shutdown requested; no further emission
    Cancelled,
}

/// How the synthetic timestamp of each record is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// `start_time + index * interval`, a deterministic replay clock
    #[default]
    Replay,
    /// `now()` at publish time
    Wall,
}

/// What to do when a publish fails (other than a consumer disconnect, which
/// always cancels the emitter).
///
/// `Skip` loses the failed record; `Retry` holds the cursor in place so
/// nothing is dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the cursor in place and retry the same record next tick
    #[default]
    Retry,
    /// Advance past the failed record
    Skip,
    /// Stop emitting
    Cancel,
}

/// Emitter tuning knobs.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Fixed delay between ticks
    pub interval: Duration,
    /// Timestamp derivation
    pub clock: ClockMode,
    /// Publish-failure handling
    pub failure_policy: FailurePolicy,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        EmitterConfig {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            clock: ClockMode::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Mutable replay position, exclusively owned by one emitter.
///
/// The index is monotonically non-decreasing and never wraps or resets.
#[derive(Debug, Clone)]
pub struct EmissionCursor {
    index: usize,
    start_time: DateTime<Utc>,
}

impl EmissionCursor {
    fn new() -> Self {
        EmissionCursor {
            index: 0,
            start_time: Utc::now(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

/// Replays one dataset into one sink, one record per tick.
pub struct Emitter<S: RecordSink> {
    name: String,
    dataset: Arc<Dataset>,
    normalizer: Option<Normalizer>,
    config: EmitterConfig,
    sink: S,
    cursor: EmissionCursor,
    state: EmitterState,
}

impl<S: RecordSink> Emitter<S> {
    pub fn new(name: impl Into<String>, dataset: Arc<Dataset>, sink: S) -> Self {
        Emitter {
            name: name.into(),
            dataset,
            normalizer: None,
            config: EmitterConfig::default(),
            sink,
            cursor: EmissionCursor::new(),
            state: EmitterState::Idle,
        }
    }

    pub fn with_config(mut self, config: EmitterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn cursor(&self) -> &EmissionCursor {
        &self.cursor
    }

    /// Run the replay loop to a terminal state.
    ///
    /// Connects the sink, then emits one record per tick until the dataset
    /// is exhausted or the token is cancelled. Cancellation is checked ahead
    /// of the timer on every iteration, so no record is published after it
    /// is observed. Always closes the sink before returning.
    pub async fn run(mut self, cancel: CancellationToken) -> EmitterState {
        if let Err(e) = self.sink.connect().await {
            error!("emitter '{}': sink connect failed: {}", self.name, e);
            self.state = EmitterState::Cancelled;
            return self.state;
        }

        self.state = EmitterState::Running;
        self.cursor.start_time = Utc::now();
        info!(
            "emitter '{}' running: {} rows every {:?}",
            self.name,
            self.dataset.len(),
            self.config.interval
        );

        let mut ticker = interval(self.config.interval);
        // A slow publish delays the following tick instead of letting ticks
        // burst to catch up; ordering stays strict either way because the
        // publish is awaited inside the tick arm.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(
                        "emitter '{}' cancelled at index {}",
                        self.name,
                        self.cursor.index
                    );
                    self.state = EmitterState::Cancelled;
                    break;
                }

                _ = ticker.tick() => {
                    if self.cursor.index >= self.dataset.len() {
                        self.state = EmitterState::Exhausted;
                        break;
                    }
                    if !self.emit_next().await {
                        break;
                    }
                }
            }
        }

        let reason = match self.state {
            EmitterState::Exhausted => CloseReason::Exhausted,
            _ => CloseReason::Cancelled,
        };
        if let Err(e) = self.sink.close(reason).await {
            warn!("emitter '{}': sink close failed: {}", self.name, e);
        }
        info!(
            "emitter '{}' finished in {:?} after {} records",
            self.name, self.state, self.cursor.index
        );
        self.state
    }

    /// Publish the record at the cursor. Returns `false` when the loop must
    /// stop (consumer gone, or the failure policy says cancel).
    async fn emit_next(&mut self) -> bool {
        let record = self.record_at(self.cursor.index);
        match self.sink.publish(&record).await {
            Ok(()) => {
                debug!(
                    "emitter '{}' sent record {} of {}",
                    self.name,
                    record.index + 1,
                    self.dataset.len()
                );
                self.cursor.index += 1;
                true
            }
            Err(PublishError::Disconnected) => {
                info!("emitter '{}': consumer disconnected", self.name);
                self.state = EmitterState::Cancelled;
                false
            }
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Retry => {
                    warn!(
                        "emitter '{}': publish failed at index {}: {}; retrying next tick",
                        self.name, record.index, e
                    );
                    true
                }
                FailurePolicy::Skip => {
                    warn!(
                        "emitter '{}': publish failed at index {}: {}; skipping record",
                        self.name, record.index, e
                    );
                    self.cursor.index += 1;
                    true
                }
                FailurePolicy::Cancel => {
                    error!(
                        "emitter '{}': publish failed at index {}: {}; cancelling",
                        self.name, record.index, e
                    );
                    self.state = EmitterState::Cancelled;
                    false
                }
            },
        }
    }

    fn record_at(&self, index: usize) -> TimestampedRecord {
        let row = &self.dataset.rows()[index];
        let row = match &self.normalizer {
            Some(normalizer) => normalizer.normalize(row),
            None => row.clone(),
        };
        let utc = match self.config.clock {
            ClockMode::Replay => {
                let offset_ms = index as i64 * self.config.interval.as_millis() as i64;
                self.cursor.start_time + chrono::Duration::milliseconds(offset_ms)
            }
            ClockMode::Wall => Utc::now(),
        };
        TimestampedRecord { index, utc, row }
    }
}
