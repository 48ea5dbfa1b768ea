//! Allocator error types.

use order_database::DatabaseError;
use thiserror::Error;

/// Allocator error type.
#[derive(Error, Debug)]
pub enum AllocatorError {
    /// Malformed identifier string
    #[error("Invalid order id: {0}")]
    InvalidId(String),

    /// The requested block would run past the end of the identifier space.
    /// Fatal; retrying cannot help.
    #[error("Identifier range exhausted: need {needed} ids starting at index {start}")]
    RangeExhausted { start: u32, needed: usize },

    /// Concurrent allocation collided on every attempt
    #[error("Allocation collided after {attempts} attempts: {source}")]
    Collision {
        attempts: u32,
        source: DatabaseError,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type alias using AllocatorError.
pub type AllocatorResult<T> = Result<T, AllocatorError>;
