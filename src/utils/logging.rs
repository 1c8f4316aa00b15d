use crate::config::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system from configuration.
///
/// Logs always go to stderr, leaving stdout to the report. When a directory is
/// configured they are also written to daily rotating files there.
///
/// # Arguments
///
/// * `config` - Logging section of the configuration
/// * `debug` - Forces the `debug` level regardless of the configured one
pub fn init_logging(config: &LoggingConfig, debug: bool) {
    let level = if debug { "debug" } else { config.level.as_str() };
    let filter = match EnvFilter::try_new(level) {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            EnvFilter::new("info")
        }
    };

    let stderr_layer = fmt::layer()
        .with_line_number(debug)
        .with_writer(std::io::stderr);

    if let Some(directory) = &config.directory {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, "cygnus.log");

        let file_layer = fmt::layer()
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }
}
