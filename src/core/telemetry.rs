//! Structured logging setup.

use crate::core::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const ENV_LOG: &str = "PANTRYSYNC_LOG";

/// Verbosity flags on top of the configured level.
pub fn level_from_verbosity(base: &str, verbosity: u8) -> String {
    match verbosity {
        0 => base.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. Calling twice is harmless.
pub fn init(logging: &LoggingConfig, verbosity: u8) {
    let default_level = level_from_verbosity(&logging.level, verbosity);
    let filter = EnvFilter::try_from_env(ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new(format!("pantrysync={}", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match logging.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    let _ = result;
}
