// Connection error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Connection error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`ConnectionError::code`].
///
/// Error code range: 1001-1006
pub struct ConnectionErrorCodes {}

impl ConnectionErrorCodes {
    /// Endpoint URL could not be parsed or has an unsupported scheme
    pub const INVALID_ENDPOINT: i32 = 1001;

    /// Transport refused or failed the connection handshake
    pub const CONNECT_FAILED: i32 = 1002;

    /// Transport failed after the connection was established
    pub const TRANSPORT: i32 = 1003;

    /// Connection manager is already running
    pub const ALREADY_RUNNING: i32 = 1004;

    /// Connection manager is not running
    pub const NOT_RUNNING: i32 = 1005;

    /// Automatic reconnection gave up
    pub const RETRIES_EXHAUSTED: i32 = 1006;
}

/// Log a connection error with structured context
///
/// Emits a single line carrying the error code, the component and the
/// human-readable message. Never panics.
pub fn log_connection_error(err: &ConnectionError, context: &str) {
    error!(
        "Connection error in {}: code={}, component=ConnectionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Connection-related errors
///
/// These cover endpoint resolution, the transport handshake, failures of an
/// established stream and manager lifecycle misuse.
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Endpoint URL is not a usable ws:// or wss:// URL
    InvalidEndpoint { url: String, reason: String },

    /// Handshake could not be completed
    ConnectFailed { reason: String },

    /// Established stream failed
    Transport { details: String },

    /// `start` called while a session task is alive
    AlreadyRunning,

    /// `disconnect` called without a running session task
    NotRunning,

    /// Reconnection stopped after the configured number of attempts
    RetriesExhausted { attempts: u32 },
}

impl ErrorCode for ConnectionError {
    fn code(&self) -> i32 {
        match self {
            ConnectionError::InvalidEndpoint { .. } => ConnectionErrorCodes::INVALID_ENDPOINT,
            ConnectionError::ConnectFailed { .. } => ConnectionErrorCodes::CONNECT_FAILED,
            ConnectionError::Transport { .. } => ConnectionErrorCodes::TRANSPORT,
            ConnectionError::AlreadyRunning => ConnectionErrorCodes::ALREADY_RUNNING,
            ConnectionError::NotRunning => ConnectionErrorCodes::NOT_RUNNING,
            ConnectionError::RetriesExhausted { .. } => ConnectionErrorCodes::RETRIES_EXHAUSTED,
        }
    }

    fn message(&self) -> String {
        match self {
            ConnectionError::InvalidEndpoint { url, reason } => {
                format!("Invalid endpoint '{}': {}", url, reason)
            }
            ConnectionError::ConnectFailed { reason } => {
                format!("Failed to connect: {}", reason)
            }
            ConnectionError::Transport { details } => format!("Transport error: {}", details),
            ConnectionError::AlreadyRunning => {
                "Connection manager already running. Call disconnect() first.".to_string()
            }
            ConnectionError::NotRunning => {
                "Connection manager not running. Call start() first.".to_string()
            }
            ConnectionError::RetriesExhausted { attempts } => {
                format!("Max reconnection attempts reached ({})", attempts)
            }
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConnectionError {}

impl From<url::ParseError> for ConnectionError {
    fn from(err: url::ParseError) -> Self {
        ConnectionError::InvalidEndpoint {
            url: String::new(),
            reason: err.to_string(),
        }
    }
}
