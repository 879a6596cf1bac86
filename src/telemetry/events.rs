//! Telemetry event types describing pipeline diagnostics exposed to the CLI.

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionState;

/// Why a frame never reached the reducers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    SchemaInvalid,
    UnknownTopic,
}

/// Diagnostics covering connection lifecycle, dropped frames and throughput.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    StateChanged {
        state: ConnectionState,
    },
    ReconnectScheduled {
        attempt: u32,
        delay_ms: u64,
    },
    ReconnectExhausted {
        attempts: u32,
    },
    FrameDropped {
        reason: DropReason,
        detail: String,
    },
    Throughput {
        messages_per_sec: f64,
    },
}
