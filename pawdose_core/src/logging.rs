//! Logging infrastructure for Pawdose.
//!
//! The library only emits `tracing` events; binaries install the subscriber.
//! Events go to stderr because stdout carries the CLI's own report.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count: quiet by default, louder per flag
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber for a binary.
///
/// `RUST_LOG`, when set, wins over the `-v` count.
pub fn init(verbosity: u8) {
    init_with_level(level_for(verbosity))
}

/// Install the stderr subscriber with an explicit fallback directive such
/// as `"debug"` or `"pawdose_core=trace"`.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route events into the test harness' captured output
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
