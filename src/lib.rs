// Noise Watch Core - crowdsourced noise measurement
// Calibrated loudness metering, recording sessions, IDW noise surfaces
// and the submission/retrieval API

// Module declarations
pub mod audio;
pub mod calibration;
pub mod config;
pub mod error;
pub mod http;
pub mod idw;
pub mod measurement;
pub mod meter;
pub mod session;
pub mod submission;

pub use config::AppConfig;
pub use error::ErrorCode;

use tracing::Level;

/// Initialize logging for binaries
///
/// Installs a `tracing_subscriber::fmt` subscriber; `log` records from the
/// config and error helpers are bridged into it. Calling it twice is a no-op.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
