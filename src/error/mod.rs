// Error types for the calibration panel pipeline
//
// This module defines the error types for connection management and log
// export, each carrying a stable numeric code for programmatic handling.
// Decode failures are not errors here: malformed frames are a
// classification outcome (see `protocol::Classification`).

mod connection;
mod export;

pub use connection::{log_connection_error, ConnectionError, ConnectionErrorCodes};
pub use export::{log_export_error, ExportError, ExportErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so the CLI and log lines report failures
/// consistently.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
