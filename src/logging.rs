//! Subscriber setup for the binary. The library itself only emits `tracing` events.

use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;

/// Map a `-v` count to a maximum level: 0 is info, 1 is debug, 2 or more is trace.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a compact fmt subscriber as the global default.
pub fn init_logging(verbosity: u8) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_max_level(level_for(verbosity))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
