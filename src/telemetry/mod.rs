//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes connection state changes, reconnect scheduling,
//! dropped frames and throughput into a bounded history plus an async
//! broadcast stream. A hub is created per dashboard and handed to the
//! connection manager; there is no process-wide instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures::{future, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::config::TelemetryConfig;
use crate::connection::ConnectionState;
use crate::protocol::{Classification, ClassificationKind};

pub mod events;

pub use events::{DropReason, MetricEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub frames: FrameCounters,
}

/// Classification outcome counts since the hub was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameCounters {
    pub decoded: u64,
    pub schema_invalid: u64,
    pub unknown_topic: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.lock_history();
            if self.history_capacity > 0 {
                if history.len() == self.history_capacity && history.pop_front().is_some() {
                    self.dropped_history.fetch_add(1, Ordering::Relaxed);
                }
                history.push_back(event.clone());
            }
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn recent(&self) -> Vec<MetricEvent> {
        self.lock_history().iter().cloned().collect()
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<MetricEvent>> {
        // history stays consistent even if a publisher panicked mid-push
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub wrapping collector state plus frame counters.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    decoded: AtomicU64,
    schema_invalid: AtomicU64,
    unknown_topic: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            decoded: AtomicU64::new(0),
            schema_invalid: AtomicU64::new(0),
            unknown_topic: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.channel_capacity, config.history_capacity)
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.collector.subscribe()
    }

    /// Live event stream; events missed by a lagging consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = MetricEvent> + Send + Unpin + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|event| future::ready(event.ok()))
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events.load(Ordering::Relaxed),
            dropped_events: self.collector.dropped_history.load(Ordering::Relaxed),
            frames: self.frame_counters(),
        }
    }

    pub fn frame_counters(&self) -> FrameCounters {
        FrameCounters {
            decoded: self.decoded.load(Ordering::Relaxed),
            schema_invalid: self.schema_invalid.load(Ordering::Relaxed),
            unknown_topic: self.unknown_topic.load(Ordering::Relaxed),
        }
    }

    /// Count a classification outcome; rejected frames are also published.
    pub fn record_classification(&self, classification: &Classification) {
        match classification {
            Classification::Decoded(_) => {
                self.decoded.fetch_add(1, Ordering::Relaxed);
            }
            Classification::SchemaInvalid { reason } => {
                self.schema_invalid.fetch_add(1, Ordering::Relaxed);
                self.collector.publish(MetricEvent::FrameDropped {
                    reason: DropReason::SchemaInvalid,
                    detail: reason.clone(),
                });
            }
            Classification::UnknownTopic { topic } => {
                self.unknown_topic.fetch_add(1, Ordering::Relaxed);
                self.collector.publish(MetricEvent::FrameDropped {
                    reason: DropReason::UnknownTopic,
                    detail: topic.clone(),
                });
            }
        }
    }

    pub fn count(&self, kind: ClassificationKind) -> u64 {
        let counters = self.frame_counters();
        match kind {
            ClassificationKind::Decoded => counters.decoded,
            ClassificationKind::SchemaInvalid => counters.schema_invalid,
            ClassificationKind::UnknownTopic => counters.unknown_topic,
        }
    }

    pub fn record_state(&self, state: ConnectionState) {
        self.collector.publish(MetricEvent::StateChanged { state });
    }

    pub fn record_reconnect_scheduled(&self, attempt: u32, delay_ms: u64) {
        self.collector
            .publish(MetricEvent::ReconnectScheduled { attempt, delay_ms });
    }

    pub fn record_reconnect_exhausted(&self, attempts: u32) {
        self.collector
            .publish(MetricEvent::ReconnectExhausted { attempts });
    }

    pub fn record_throughput(&self, messages_per_sec: f64) {
        self.collector
            .publish(MetricEvent::Throughput { messages_per_sec });
    }

    /// Reconnect delays published so far, oldest first (bounded by history)
    pub fn reconnect_delays(&self) -> Vec<u64> {
        self.collector
            .recent()
            .into_iter()
            .filter_map(|event| match event {
                MetricEvent::ReconnectScheduled { delay_ms, .. } => Some(delay_ms),
                _ => None,
            })
            .collect()
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}
