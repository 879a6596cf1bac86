// Calibration Panel Core - stream-to-state reducer pipeline
// Folds a live person-detection / tracker tap into observable view state

// Module declarations
pub mod analysis;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod protocol;
pub mod session;
pub mod state;
pub mod telemetry;

#[cfg(any(test, feature = "test_fixtures"))]
pub mod testing;

// Re-exports for convenience
pub use config::AppConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use coordinator::DataCoordinator;
pub use error::{ConnectionError, ErrorCode, ExportError};
pub use session::{Dashboard, DashboardStatus};

use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::LevelFilter;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Install the process-wide log sink.
///
/// `tracing_subscriber::fmt` also captures records emitted through the `log`
/// facade. Output goes to stderr so command output on stdout stays
/// parseable. `level` is a level name (`error`..`trace`); unknown names fall
/// back to `info`. Only the first call has any effect.
pub fn init_logging(level: &str) {
    LOGGING.get_or_init(|| {
        let filter = LevelFilter::from_str(level).unwrap_or(LevelFilter::INFO);
        // another subscriber may already be installed by an embedding binary
        let _ = tracing_subscriber::fmt()
            .with_max_level(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
