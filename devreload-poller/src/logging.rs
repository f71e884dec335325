//! Logging setup for devreload
//!
//! Check failures and reloads are reported through `tracing`. Library users
//! install their own subscriber; binaries call [`init_logging`] once at
//! startup.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed
    Silent,
    /// Compact stderr output at info level
    Development,
    /// Verbose output with source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `DEVRELOAD_LOG_LEVEL`: Override the filter (e.g. `debug`, `reload_poller=trace`)
/// - `RUST_LOG`: Used when `DEVRELOAD_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    init_logging_with_level(mode, None)
}

/// Initialize logging with an explicit filter that wins over the environment.
///
/// Filter precedence: `level`, then `DEVRELOAD_LOG_LEVEL`, then `RUST_LOG`,
/// then the mode's default (`info` for development, `debug` for debug).
pub fn init_logging_with_level(
    mode: LoggingMode,
    level: Option<&str>,
) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let Some(default_level) = default_level(mode) else {
        return Ok(());
    };

    let directive = filter_directive(
        level,
        std::env::var("DEVRELOAD_LOG_LEVEL").ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
        default_level,
    );
    let filter = EnvFilter::new(directive);

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .with(filter);

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .pretty()
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter);

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `DEVRELOAD_LOG_MODE` (`silent`, `development`, `debug`).
///
/// Defaults to development output.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_env_value(
        std::env::var("DEVRELOAD_LOG_MODE").ok().as_deref(),
    ))
}

fn mode_from_env_value(value: Option<&str>) -> LoggingMode {
    match value {
        Some("silent") => LoggingMode::Silent,
        Some("debug") => LoggingMode::Debug,
        _ => LoggingMode::Development,
    }
}

fn default_level(mode: LoggingMode) -> Option<&'static str> {
    match mode {
        LoggingMode::Silent => None,
        LoggingMode::Development => Some("info"),
        LoggingMode::Debug => Some("debug"),
    }
}

/// First non-empty of explicit level, DEVRELOAD_LOG_LEVEL, RUST_LOG, default
fn filter_directive(
    explicit: Option<&str>,
    devreload_env: Option<&str>,
    rust_log: Option<&str>,
    default_level: &str,
) -> String {
    [explicit, devreload_env, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(default_level)
        .to_string()
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[test]
    fn test_silent_mode_installs_no_subscriber() {
        init_logging_with_level(LoggingMode::Silent, Some("trace")).unwrap();
        assert!(!is_initialized());
    }

    #[test]
    fn test_mode_defaults() {
        assert_eq!(default_level(LoggingMode::Silent), None);
        assert_eq!(default_level(LoggingMode::Development), Some("info"));
        assert_eq!(default_level(LoggingMode::Debug), Some("debug"));
    }

    #[test]
    fn test_filter_precedence() {
        // Explicit level wins over everything
        assert_eq!(
            filter_directive(Some("warn"), Some("trace"), Some("error"), "debug"),
            "warn"
        );
        // Then DEVRELOAD_LOG_LEVEL
        assert_eq!(filter_directive(None, Some("trace"), Some("error"), "debug"), "trace");
        // Then RUST_LOG
        assert_eq!(filter_directive(None, None, Some("debug"), "info"), "debug");
        // Then the mode default
        assert_eq!(filter_directive(None, None, None, "debug"), "debug");
        // Empty values are skipped
        assert_eq!(filter_directive(None, Some(""), Some("  "), "info"), "info");
    }

    #[test]
    fn test_mode_from_env_value() {
        assert_eq!(mode_from_env_value(Some("silent")), LoggingMode::Silent);
        assert_eq!(mode_from_env_value(Some("debug")), LoggingMode::Debug);
        assert_eq!(mode_from_env_value(Some("development")), LoggingMode::Development);
        assert_eq!(mode_from_env_value(None), LoggingMode::Development);
    }
}
