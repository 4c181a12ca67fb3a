//! Error types for the exporter
//!
//! This module defines the error types used throughout the export pipeline,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for export operations
///
/// Covers configuration problems, missing credentials, transport and
/// protocol failures against the remote service, run supervision, and
/// local persistence.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authorization token or cookie missing before a run starts
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Request could not be sent or the response was unreadable
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not have the expected envelope shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A second run was requested while one is still active
    #[error("An export run is already active")]
    RunActive,

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
}

/// Result type alias for export operations
///
/// Uses `anyhow::Error` so callers keep rich context while still being able
/// to downcast to [`ExportError`].
pub type Result<T> = anyhow::Result<T>;
