//! Diagnostic logging to stderr.
//!
//! stdout carries the track headers, so log lines never go there.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `debug` or
/// `ym2149_jukebox=trace`. Takes precedence over `RUST_LOG`.
pub const LOG_ENV: &str = "YM_JUKEBOX_LOG";

/// Filter used when neither environment variable is set.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
