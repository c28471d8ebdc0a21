//! Indexer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during indexing operations.
///
/// Per-file analysis problems are never reported through this type; they are
/// attached to the file's [`FileSummary`](crate::FileSummary) instead.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Project root is missing or is not a directory
    #[error("Invalid project root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Path not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Background task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

impl From<serde_json::Error> for IndexerError {
    fn from(e: serde_json::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for IndexerError {
    fn from(e: tokio::task::JoinError) -> Self {
        IndexerError::Task(e.to_string())
    }
}

impl From<notify::Error> for IndexerError {
    fn from(e: notify::Error) -> Self {
        IndexerError::Watcher(e.to_string())
    }
}
