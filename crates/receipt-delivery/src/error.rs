//! Delivery error types.

use receipt_outbox::OutboxError;
use thiserror::Error;

/// Delivery error type.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Outbox error
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    /// Receipt file name does not match `RECEIPT_<participant>_<14 digits>.txt`
    #[error("Invalid receipt file name: {0}")]
    InvalidFileName(String),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
