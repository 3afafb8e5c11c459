//! Ledger error types.

use purse_shared::AppError;
use purse_shared::types::TransactionId;
use thiserror::Error;

use super::types::TransactionStatus;
use crate::error::StorageError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transaction not found.
    #[error("transaction not found: {0}")]
    NotFound(TransactionId),

    /// Status change rejected by the lifecycle rules.
    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The transaction.
        id: TransactionId,
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            LedgerError::Storage(e) => e.into(),
        }
    }
}
