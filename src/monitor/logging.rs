//! Diagnostic logging setup
//!
//! Diagnostics are written to stderr so that stdout carries only the
//! monitor's event records. An optional append-mode log file receives the
//! same diagnostics.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize diagnostic logging.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be
/// opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use chatmon::config::LoggingConfig;
/// use chatmon::monitor::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json_format: false,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);

        match file {
            Some(file) => {
                let file_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(file);
                registry.with(stderr_layer).with(file_layer).try_init()?;
            }
            None => registry.with(stderr_layer).try_init()?,
        }
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        match file {
            Some(file) => {
                let file_layer = fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .with_writer(file);
                registry.with(stderr_layer).with(file_layer).try_init()?;
            }
            None => registry.with(stderr_layer).try_init()?,
        }
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_build_filter_accepts_configured_level() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("chatmon=trace,warn").is_ok());
    }

    #[test]
    #[serial]
    fn test_build_filter_rejects_garbage_level() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter("[[not a filter").is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.file_path.is_none());
    }
}
