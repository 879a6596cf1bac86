// Export error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Export error code constants
///
/// Error code range: 2001-2002
pub struct ExportErrorCodes {}

impl ExportErrorCodes {
    /// Snapshot could not be serialized to JSON
    pub const SERIALIZE: i32 = 2001;

    /// Snapshot file could not be written
    pub const IO: i32 = 2002;
}

/// Log an export error with structured context
pub fn log_export_error(err: &ExportError, context: &str) {
    error!(
        "Export error in {}: code={}, component=Export, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while writing a calibration log export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// JSON serialization failed
    Serialize { reason: String },

    /// Writing the export file failed
    Io { details: String },
}

impl ErrorCode for ExportError {
    fn code(&self) -> i32 {
        match self {
            ExportError::Serialize { .. } => ExportErrorCodes::SERIALIZE,
            ExportError::Io { .. } => ExportErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            ExportError::Serialize { reason } => format!("Failed to serialize export: {}", reason),
            ExportError::Io { details } => format!("Failed to write export: {}", details),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExportError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialize {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_error_codes() {
        assert_eq!(
            ExportError::Serialize {
                reason: "x".to_string()
            }
            .code(),
            2001
        );
        assert_eq!(
            ExportError::Io {
                details: "x".to_string()
            }
            .code(),
            2002
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ExportError = io_err.into();

        match err {
            ExportError::Io { details } => assert!(details.contains("read-only")),
            _ => panic!("Expected Io variant"),
        }
    }
}
