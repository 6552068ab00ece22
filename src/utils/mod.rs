//! Utilities: logging setup (level from -v/-q, RUST_LOG override).
//!
//! Key items:
//!   derive_level / init_logging
//!
//! Everything goes to stderr; stdout belongs to the MCP transport.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Map -q / -v / -vv onto a tracing level.
pub fn derive_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter used when RUST_LOG is unset or invalid.
fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(level.as_str().to_ascii_lowercase())
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::env::var_os("NO_COLOR").is_none())
        .try_init();
}
