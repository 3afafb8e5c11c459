//! In-memory wallet store and ledger.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use purse_shared::types::{CurrencyCode, TransactionId, WalletId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StorageError;
use crate::escrow::{EscrowStore, EscrowUnit, LockMode};
use crate::ledger::{
    LedgerError, NewTransaction, TransactionLedger, TransactionRecord, TransactionStatus,
};
use crate::wallet::{Subwallet, Wallet, WalletError, WalletStore};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    wallets: HashMap<WalletId, Wallet>,
    subwallets: BTreeMap<(WalletId, CurrencyCode), Subwallet>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
    next_tx: i64,
}

impl MemoryState {
    fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        if self
            .transactions
            .values()
            .any(|tx| tx.request_key == new.request_key)
        {
            return Err(StorageError::new(
                "ledger.insert",
                format!("duplicate request key {:?}", new.request_key),
            )
            .into());
        }
        self.next_tx += 1;
        let record = TransactionRecord::created(TransactionId(self.next_tx), new, Utc::now());
        self.transactions.insert(record.id, record.clone());
        Ok(record)
    }

    fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        let record = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        record.transition_to(status)?;
        Ok(record.clone())
    }
}

#[derive(Debug, Default)]
struct Shared {
    committed: RwLock<MemoryState>,
    writer: Arc<Mutex<()>>,
    fail_commits: AtomicUsize,
}

impl Shared {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.committed.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.committed.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wallet store, ledger and escrow store backed by process memory.
///
/// Cloning is cheap; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` unit commits fail with a storage error.
    pub fn fail_next_commits(&self, count: usize) {
        self.shared.fail_commits.store(count, Ordering::SeqCst);
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.shared.read().transactions.len()
    }

    /// Committed state of one subwallet.
    #[must_use]
    pub fn subwallet(&self, wallet_id: WalletId, currency: &CurrencyCode) -> Option<Subwallet> {
        self.shared
            .read()
            .subwallets
            .get(&(wallet_id, currency.clone()))
            .cloned()
    }
}

impl WalletStore for MemoryStore {
    async fn create_wallet(&self) -> Result<Wallet, WalletError> {
        let _writer = self.shared.writer.lock().await;
        let wallet = Wallet::generate();
        self.shared.write().wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn get_balance(&self, wallet_id: WalletId) -> Result<Vec<Subwallet>, WalletError> {
        let state = self.shared.read();
        if !state.wallets.contains_key(&wallet_id) {
            return Err(WalletError::NotFound(wallet_id));
        }
        Ok(state
            .subwallets
            .values()
            .filter(|sub| sub.wallet_id == wallet_id)
            .cloned()
            .collect())
    }
}

impl TransactionLedger for MemoryStore {
    async fn create_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        let _writer = self.shared.writer.lock().await;
        self.shared.write().insert_transaction(new)
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        let _writer = self.shared.writer.lock().await;
        self.shared.write().set_status(id, status)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        self.shared
            .read()
            .transactions
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }
}

impl EscrowStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, StorageError> {
        let guard = Arc::clone(&self.shared.writer).lock_owned().await;
        let work = self.shared.read().clone();
        Ok(MemoryUnit {
            _writer: guard,
            shared: Arc::clone(&self.shared),
            work,
        })
    }
}

/// Unit of work over a private copy of the store.
///
/// Holds the store's writer lock until committed or dropped.
#[derive(Debug)]
pub struct MemoryUnit {
    _writer: OwnedMutexGuard<()>,
    shared: Arc<Shared>,
    work: MemoryState,
}

impl EscrowUnit for MemoryUnit {
    async fn find_by_request_key(
        &mut self,
        key: &str,
    ) -> Result<Option<TransactionRecord>, StorageError> {
        Ok(self
            .work
            .transactions
            .values()
            .find(|tx| tx.request_key == key)
            .cloned())
    }

    async fn wallet_exists(&mut self, wallet_id: WalletId) -> Result<bool, StorageError> {
        Ok(self.work.wallets.contains_key(&wallet_id))
    }

    async fn lock_subwallet(
        &mut self,
        wallet_id: WalletId,
        currency: &CurrencyCode,
        mode: LockMode,
    ) -> Result<Option<Subwallet>, StorageError> {
        let key = (wallet_id, currency.clone());
        if mode == LockMode::CreateMissing {
            self.work
                .subwallets
                .entry(key.clone())
                .or_insert_with(|| Subwallet::empty(wallet_id, currency.clone()));
        }
        Ok(self.work.subwallets.get(&key).cloned())
    }

    async fn save_subwallet(&mut self, subwallet: &Subwallet) -> Result<(), StorageError> {
        if !subwallet.is_consistent() {
            return Err(StorageError::new(
                "escrow.save_subwallet",
                "balance would become negative",
            ));
        }
        let key = (subwallet.wallet_id, subwallet.currency.clone());
        match self.work.subwallets.get_mut(&key) {
            Some(row) => {
                *row = subwallet.clone();
                Ok(())
            }
            None => Err(StorageError::new(
                "escrow.save_subwallet",
                "subwallet was not locked",
            )),
        }
    }

    async fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        self.work.insert_transaction(new)
    }

    async fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        self.work.set_status(id, status)
    }

    async fn commit(self) -> Result<(), StorageError> {
        let injected = self
            .shared
            .fail_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StorageError::new("escrow.commit", "injected commit failure"));
        }
        *self.shared.write() = self.work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionType;
    use rust_decimal_macros::dec;

    fn new_tx(wallet_id: WalletId, key: &str) -> NewTransaction {
        NewTransaction {
            wallet_id,
            currency: CurrencyCode::parse("USD").unwrap(),
            transaction_type: TransactionType::Invoice,
            amount: dec!(10),
            request_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_balance_of_unknown_wallet() {
        let store = MemoryStore::new();
        let missing = WalletId::new();
        assert!(matches!(
            store.get_balance(missing).await,
            Err(WalletError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_new_wallet_has_no_balances() {
        let store = MemoryStore::new();
        let wallet = store.create_wallet().await.unwrap();
        assert!(store.get_balance(wallet.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_ids_increase() {
        let store = MemoryStore::new();
        let wallet = store.create_wallet().await.unwrap();
        let a = store.create_transaction(new_tx(wallet.id, "a")).await.unwrap();
        let b = store.create_transaction(new_tx(wallet.id, "b")).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.status, TransactionStatus::Created);
        assert_eq!(store.get_transaction(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_get_unknown_transaction() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_transaction(TransactionId(42)).await,
            Err(LedgerError::NotFound(TransactionId(42)))
        ));
    }

    #[tokio::test]
    async fn test_dropped_unit_rolls_back() {
        let store = MemoryStore::new();
        let wallet = store.create_wallet().await.unwrap();
        let usd = CurrencyCode::parse("USD").unwrap();

        {
            let mut unit = store.begin().await.unwrap();
            unit.lock_subwallet(wallet.id, &usd, LockMode::CreateMissing)
                .await
                .unwrap();
            unit.insert_transaction(new_tx(wallet.id, "a")).await.unwrap();
        }

        assert!(store.subwallet(wallet.id, &usd).is_none());
        assert_eq!(store.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_balances_are_scoped_to_wallet() {
        let store = MemoryStore::new();
        let first = store.create_wallet().await.unwrap();
        let second = store.create_wallet().await.unwrap();
        let usd = CurrencyCode::parse("USD").unwrap();

        let mut unit = store.begin().await.unwrap();
        for id in [first.id, second.id] {
            unit.lock_subwallet(id, &usd, LockMode::CreateMissing)
                .await
                .unwrap();
        }
        unit.commit().await.unwrap();

        let balances = store.get_balance(first.id).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].wallet_id, first.id);
    }
}
