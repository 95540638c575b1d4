//! Error types for `neotasks`.

use crate::task::TaskId;

/// Errors surfaced by the store, the storage backend and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred while reading or writing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON encoding error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be parsed.
    #[error("config error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration was parsed but is not usable.
    #[error("config error: {0}")]
    Config(String),

    /// An import payload was rejected; the store was left unchanged.
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Reasons an import payload is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The payload is not valid JSON.
    #[error("invalid JSON file: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload decoded but is not a list of tasks.
    #[error("expected a list of tasks")]
    NotASequence,

    /// One record does not have the shape of a task.
    #[error("task #{index} is invalid: {reason}")]
    InvalidRecord {
        /// Zero-based position of the record in the payload.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Two records share an id.
    #[error("duplicate task id {0}")]
    DuplicateId(TaskId),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
