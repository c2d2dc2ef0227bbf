//! Error types for flinger
//!
//! Error messages are written for the operator running a test batch and
//! say what to fix where that is obvious.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flinger
#[derive(Error, Debug)]
pub enum Error {
    // === Test Lifecycle Errors ===
    #[error("The program to execute does not exist ({})", .0.display())]
    ProgramNotFound(PathBuf),

    #[error("Failed to spawn '{}': {source}", .path.display())]
    SpawnFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Test '{0}' was already started; a test case cannot be restarted")]
    AlreadyStarted(String),

    // === Manifest Errors ===
    #[error("Failed to parse test manifest '{path}': {message}")]
    ManifestParse { path: String, message: String },

    #[error("Invalid test manifest: {0}")]
    InvalidManifest(String),

    #[error("Pre-flight check failed:\n  {}", .0.join("\n  "))]
    Preflight(Vec<String>),

    // === Log Sink Errors ===
    #[error("Failed to open run log '{}': {source}", .path.display())]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a spawn failure error for the given program
    pub fn spawn_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SpawnFailure {
            path: path.into(),
            source,
        }
    }

    /// Create a manifest parse error
    pub fn manifest_parse(path: &std::path::Path, message: impl ToString) -> Self {
        Self::ManifestParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
