//! Logging configuration using tracing
//!
//! Structured logging to stderr. `RUST_LOG` takes precedence over the level
//! in the config file.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=casebridge=trace,reqwest=info` - Per-crate levels
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init(config: &LoggingConfig) -> crate::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        "compact" => registry
            .with(fmt::layer().compact().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr)
                    .pretty(),
            )
            .try_init(),
    };

    result.map_err(|e| crate::RelayError::Other(format!("Failed to initialize tracing: {}", e)))
}

/// Initialize with defaults, for use before the config has been read
pub fn init_default() -> crate::Result<()> {
    init(&LoggingConfig::default())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init_default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        init_test();
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
        };
        assert!(init(&config).is_err());
    }

    #[test]
    fn test_init_test_helper() {
        init_test();
        init_test();
    }

    #[test]
    fn test_logging_macros() {
        init_test();

        tracing::debug!("This is a debug message");
        tracing::info!(case_id = "c1", outcome = "created", "Structured message");
        tracing::warn!("This is a warning message");
    }
}
