//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! The library crates log through the `log` facade; the subscriber installed
//! here bridges those records, so one filter governs both.
//!
//! # Log Levels
//!
//! - `error`: fatal errors (`-q`)
//! - `warn`: diagnostics such as column mapping gaps (default)
//! - `info`: stage progress, row counts (`-v`)
//! - `debug`: per-sheet details, path resolution (`-vv`)
//! - `trace`: everything (`-vvv`)
//!
//! `RUST_LOG` takes precedence over the flags.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Include the module path of each event.
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_target: false,
            with_ansi: io::stderr().is_terminal(),
        }
    }
}

impl LogConfig {
    /// Build from `-v` count and `-q`. Quiet wins.
    #[must_use]
    pub fn from_flags(verbosity: u8, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else {
            match verbosity {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };
        Self {
            level,
            with_target: verbosity >= 2,
            ..Default::default()
        }
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Install the global subscriber, writing to stderr. Call once at startup;
/// later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_flags(0, false).level, Level::WARN);
        assert_eq!(LogConfig::from_flags(1, false).level, Level::INFO);
        assert_eq!(LogConfig::from_flags(2, false).level, Level::DEBUG);
        assert_eq!(LogConfig::from_flags(9, false).level, Level::TRACE);
    }

    #[test]
    fn quiet_overrides_verbosity() {
        assert_eq!(LogConfig::from_flags(2, true).level, Level::ERROR);
    }
}
