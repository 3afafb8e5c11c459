//! Wallet storage trait.

use std::future::Future;

use purse_shared::types::WalletId;

use super::error::WalletError;
use super::types::{Subwallet, Wallet};

/// Read/write access to wallets and their balances.
///
/// Implemented by the db crate for PostgreSQL and by
/// [`crate::memory::MemoryStore`] for tests. Subwallet mutations are not
/// part of this trait: they only happen inside an escrow unit of work
/// (see [`crate::escrow::EscrowUnit`]).
pub trait WalletStore: Send + Sync {
    /// Generates and persists a new wallet.
    fn create_wallet(&self) -> impl Future<Output = Result<Wallet, WalletError>> + Send;

    /// Returns every subwallet of a wallet, ordered by currency.
    ///
    /// An existing wallet without subwallets yields an empty list.
    fn get_balance(
        &self,
        wallet_id: WalletId,
    ) -> impl Future<Output = Result<Vec<Subwallet>, WalletError>> + Send;
}
