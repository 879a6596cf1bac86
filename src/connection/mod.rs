// Connection module - one logical connection to the tap stream
//
// - transport: Transport/FrameStream traits plus the WebSocket implementation
// - backoff: exponential reconnect schedule with a bounded retry budget
// - schedule: cancellation tokens and cancellable timers
// - throughput: decoded-message counter drained once per tick
// - manager: ConnectionManager state machine driving all of the above

pub mod backoff;
pub mod manager;
pub mod schedule;
pub mod throughput;
pub mod transport;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use backoff::ReconnectPolicy;
pub use manager::{ConnectionEvents, ConnectionManager};
pub use schedule::{sleep_or_cancel, CancelToken, ScheduledTask, TimerOutcome};
pub use throughput::ThroughputWindow;
pub use transport::{Frame, FrameStream, Transport, WebSocketTransport, NORMAL_CLOSURE};

/// Connection manager lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, stopped by the caller, or closed normally by the server
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting `delay_ms` before retry number `attempt` (1-based)
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// Retry budget spent; only a manual restart leaves this state
    Failed { attempts: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True when no further automatic transition will happen
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed { .. }
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting { attempt, delay_ms } => {
                write!(f, "reconnecting in {}ms (attempt {})", delay_ms, attempt)
            }
            ConnectionState::Failed { attempts } => {
                write!(f, "failed after {} reconnect attempts", attempts)
            }
        }
    }
}
