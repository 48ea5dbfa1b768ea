//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata sidecar could not be serialized or parsed
    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No entry with the given file name in the given directory
    #[error("No outbox entry named {file_name} in {dir}")]
    EntryNotFound { dir: &'static str, file_name: String },

    /// Rename refused because the target name already exists
    #[error("Rename target already exists: {target}")]
    DuplicateTarget { target: String },
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
