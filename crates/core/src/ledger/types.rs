//! Transaction record and lifecycle types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use purse_shared::types::{CurrencyCode, TransactionId, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Kind of balance operation a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Credit.
    Invoice,
    /// Debit.
    Withdraw,
}

impl TransactionType {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "Invoice",
            Self::Withdraw => "Withdraw",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Invoice" => Ok(Self::Invoice),
            "Withdraw" => Ok(Self::Withdraw),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Recorded, not yet settled.
    Created,
    /// Settled successfully.
    Success,
    /// Settlement failed (e.g. insufficient funds).
    Error,
}

impl TransactionStatus {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Success => "Success",
            Self::Error => "Error",
        }
    }

    /// Returns true for `Success` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Only `Created -> Success` and `Created -> Error` are allowed.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(self, Self::Created) && to.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Success" => Ok(Self::Success),
            "Error" => Ok(Self::Error),
            _ => Err(format!("Unknown transaction status: {s}")),
        }
    }
}

/// Input for recording a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Wallet the operation applies to.
    pub wallet_id: WalletId,
    /// Currency of the affected subwallet.
    pub currency: CurrencyCode,
    /// Operation kind.
    pub transaction_type: TransactionType,
    /// Requested amount.
    pub amount: Decimal,
    /// Idempotency key of the originating request.
    pub request_key: String,
}

/// A persisted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Sequence-assigned identifier.
    pub id: TransactionId,
    /// Wallet the operation applied to.
    pub wallet_id: WalletId,
    /// Currency of the affected subwallet.
    pub currency: CurrencyCode,
    /// Operation kind.
    pub transaction_type: TransactionType,
    /// Requested amount.
    pub amount: Decimal,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Idempotency key of the originating request.
    pub request_key: String,
    /// Creation time.
    pub date_created: DateTime<Utc>,
}

impl TransactionRecord {
    /// Builds the `Created` record for a freshly assigned id.
    #[must_use]
    pub fn created(id: TransactionId, new: NewTransaction, date_created: DateTime<Utc>) -> Self {
        Self {
            id,
            wallet_id: new.wallet_id,
            currency: new.currency,
            transaction_type: new.transaction_type,
            amount: new.amount,
            status: TransactionStatus::Created,
            request_key: new.request_key,
            date_created,
        }
    }

    /// Applies a guarded status transition.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidTransition` and leaves the record
    /// untouched if the transition is not allowed.
    pub fn transition_to(&mut self, to: TransactionStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
