//! Error types for Chatmon
//!
//! This module defines the error taxonomy used throughout the monitor,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatmon operations
///
/// Configuration errors are fatal at startup. Everything raised after an
/// event has been received is contained by the dispatcher and degrades to
/// a diagnostic or an inline note on the event record.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related errors (missing or invalid required field)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gateway/event source errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Datastore path could not be inspected
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// Every configured datastore path has been removed
    #[error("No valid datastore paths remaining")]
    NoDatastorePaths,

    /// Attachment download errors
    #[error("Download error: {0}")]
    Download(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid rule pattern
    #[error("Invalid message regex: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for Chatmon operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
