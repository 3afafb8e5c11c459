//! Unit-of-work seam used by the escrow engine.

use std::future::Future;

use purse_shared::types::{CurrencyCode, TransactionId, WalletId};

use crate::error::StorageError;
use crate::ledger::{LedgerError, NewTransaction, TransactionRecord, TransactionStatus};
use crate::wallet::Subwallet;

/// How [`EscrowUnit::lock_subwallet`] treats a missing subwallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Create a zero-balance subwallet and lock it.
    CreateMissing,
    /// Return `None`.
    ExistingOnly,
}

/// Opens escrow units of work.
pub trait EscrowStore: Send + Sync {
    /// Unit type handed out by [`Self::begin`].
    type Unit: EscrowUnit;

    /// Starts a unit. Nothing it writes is visible until
    /// [`EscrowUnit::commit`]; dropping it rolls everything back.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StorageError>> + Send;
}

/// One atomic storage transaction spanning subwallets and transactions.
///
/// Subwallets locked through a unit stay locked against other units until it
/// commits or is dropped.
pub trait EscrowUnit: Send {
    /// Looks up a transaction by idempotency key.
    fn find_by_request_key(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, StorageError>> + Send;

    /// Returns true if the wallet exists.
    fn wallet_exists(
        &mut self,
        wallet_id: WalletId,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Locks a subwallet for the rest of the unit and returns its balances.
    fn lock_subwallet(
        &mut self,
        wallet_id: WalletId,
        currency: &CurrencyCode,
        mode: LockMode,
    ) -> impl Future<Output = Result<Option<Subwallet>, StorageError>> + Send;

    /// Writes back a subwallet previously returned by [`Self::lock_subwallet`].
    fn save_subwallet(
        &mut self,
        subwallet: &Subwallet,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Inserts a transaction record in status `Created`.
    fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> impl Future<Output = Result<TransactionRecord, LedgerError>> + Send;

    /// Guarded status transition, same rules as
    /// [`crate::ledger::TransactionLedger::set_status`].
    fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> impl Future<Output = Result<TransactionRecord, LedgerError>> + Send;

    /// Makes every write of the unit visible at once.
    fn commit(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
