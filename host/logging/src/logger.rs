//! Structured Logger
//!
//! Wraps `tracing`: console output, plus daily-rolling NDJSON files when a
//! log directory is given, with environment-based level control.

use std::path::Path;

use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global logger. `level` is the fallback when `RUST_LOG`
/// is unset. Safe to call more than once; later calls are no-ops.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            // NDJSON to `<dir>/lodestone.log.YYYY-MM-DD`
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "lodestone.log");
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);
            let _ = registry.with(file_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }

    debug!("Logging initialized");
}
