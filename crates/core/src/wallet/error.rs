//! Wallet error types.

use purse_shared::AppError;
use purse_shared::types::WalletId;
use thiserror::Error;

use crate::error::StorageError;

/// Errors returned by [`super::WalletStore`].
#[derive(Debug, Error)]
pub enum WalletError {
    /// Wallet does not exist.
    #[error("wallet not found: {0}")]
    NotFound(WalletId),

    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotFound(_) => Self::NotFound(err.to_string()),
            WalletError::Storage(e) => e.into(),
        }
    }
}
