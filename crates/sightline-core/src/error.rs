//! Core error types for Sightline.

use sightline_indexer::IndexerError;
use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Indexing engine error
    #[error(transparent)]
    Indexer(#[from] IndexerError),

    /// Invalid configuration file
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        CoreError::Task(e.to_string())
    }
}
