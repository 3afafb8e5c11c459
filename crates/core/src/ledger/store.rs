//! Transaction ledger storage trait.

use std::future::Future;

use purse_shared::types::TransactionId;

use super::error::LedgerError;
use super::types::{NewTransaction, TransactionRecord, TransactionStatus};

/// Standalone access to transaction records.
///
/// Each call is its own atomic operation. The escrow engine does not use
/// this trait; it performs the same steps inside one unit of work through
/// [`crate::escrow::EscrowUnit`].
pub trait TransactionLedger: Send + Sync {
    /// Inserts a record in status `Created`, stamped with the current time.
    fn create_transaction(
        &self,
        new: NewTransaction,
    ) -> impl Future<Output = Result<TransactionRecord, LedgerError>> + Send;

    /// Moves a `Created` record to a terminal status.
    ///
    /// Fails with [`LedgerError::InvalidTransition`] if the record is already
    /// terminal or the target is not terminal; nothing changes in that case.
    fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> impl Future<Output = Result<TransactionRecord, LedgerError>> + Send;

    /// Reads a record.
    fn get_transaction(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<TransactionRecord, LedgerError>> + Send;
}
