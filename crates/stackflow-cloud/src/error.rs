//! Cloud provider and state ledger error types

use std::path::PathBuf;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// State ledger errors
#[derive(Error, Debug)]
pub enum StateError {
    /// The ledger exists but is not a valid type -> id -> metadata mapping
    #[error("State file is corrupt: {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("State file could not be read: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file could not be written: {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State could not be serialized: {0}")]
    Serialize(String),

    #[error("State store was opened read-only: {0}")]
    ReadOnly(PathBuf),
}
