//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! `RUST_LOG` takes precedence over `logging.level`. When `logging.log_dir` is
//! set, output is also written to a daily-rolling file through a non-blocking
//! writer; keep the returned guard alive until shutdown so buffered lines are
//! flushed.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the subscriber. Call once, before anything logs.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = env_filter(&config.level);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive_parses() {
        let filter = EnvFilter::new("drone_guard=debug,info");
        assert!(filter.to_string().contains("drone_guard=debug"));
    }
}
