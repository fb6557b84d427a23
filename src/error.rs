//! Error types for the book builder

use thiserror::Error;

/// Book builder errors
///
/// The book itself never fails on feed content; these cover the I/O
/// surfaces around it and the consistency checker.
#[derive(Error, Debug)]
pub enum BookError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Feed has no header line")]
    MissingHeader,

    #[error("Snapshot write error: {0}")]
    SnapshotWrite(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Book inconsistency: {0}")]
    InconsistentState(String),
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::SerializationError(err.to_string())
    }
}

impl From<sqlx::Error> for BookError {
    fn from(err: sqlx::Error) -> Self {
        BookError::Persistence(err.to_string())
    }
}

impl From<config::ConfigError> for BookError {
    fn from(err: config::ConfigError) -> Self {
        BookError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for BookError {
    fn from(err: prometheus::Error) -> Self {
        BookError::Metrics(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BookError>;
