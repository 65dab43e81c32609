//! Tracing utilities for the batcher.

use anyhow::{anyhow, Result};
use tracing::Level;

/// Maps a verbosity count to the max log level, from ERROR at 0 to TRACE at 4 and above.
pub const fn verbosity_to_level(verbosity_level: u8) -> Level {
    match verbosity_level {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initializes the global tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err if a global subscriber is already set.
pub fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(verbosity_to_level(verbosity_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
