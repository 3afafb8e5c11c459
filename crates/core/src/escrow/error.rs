//! Escrow engine error types.

use std::time::Duration;

use purse_shared::AppError;
use purse_shared::types::{CurrencyCode, WalletId};
use thiserror::Error;

use crate::error::StorageError;
use crate::ledger::LedgerError;
use crate::wallet::BalanceOverflow;

/// Errors returned by [`super::EscrowEngine`].
#[derive(Debug, Error)]
pub enum EscrowError {
    /// The request was rejected before any storage access.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The wallet does not exist.
    #[error("wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// A withdrawal targeted a currency the wallet has never been credited in.
    #[error("subwallet not found: wallet {wallet_id}, currency {currency}")]
    SubwalletNotFound {
        /// The wallet.
        wallet_id: WalletId,
        /// The missing currency.
        currency: CurrencyCode,
    },

    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The unit did not finish in time and was rolled back.
    #[error("escrow unit timed out after {0:?}")]
    Timeout(Duration),
}

impl EscrowError {
    /// Returns true if running the same request again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Timeout(_) | Self::Ledger(LedgerError::Storage(_))
        )
    }
}

impl From<BalanceOverflow> for EscrowError {
    fn from(err: BalanceOverflow) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EscrowError> for AppError {
    fn from(err: EscrowError) -> Self {
        match err {
            EscrowError::Validation(msg) => Self::Validation(msg),
            EscrowError::WalletNotFound(_) | EscrowError::SubwalletNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            EscrowError::Ledger(e) => e.into(),
            EscrowError::Storage(e) => e.into(),
            EscrowError::Timeout(_) => Self::Internal(err.to_string()),
        }
    }
}
