//! Storage error shared by every store trait.

use std::fmt::Display;

use purse_shared::AppError;
use thiserror::Error;

/// Persistence failure, tagged with the operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op}: {message}")]
pub struct StorageError {
    /// Operation name, e.g. `escrow.lock_subwallet`.
    pub op: &'static str,
    /// Underlying driver message.
    pub message: String,
}

impl StorageError {
    /// Wraps any displayable error with operation context.
    #[must_use]
    pub fn new(op: &'static str, err: impl Display) -> Self {
        Self {
            op,
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
