//! Reserve/settle protocol for invoices and withdrawals.

use tracing::{debug, info};

use super::error::EscrowError;
use super::request::{EscrowOutcome, EscrowRequest};
use super::store::{EscrowStore, EscrowUnit, LockMode};
use crate::error::StorageError;
use crate::ledger::{NewTransaction, TransactionRecord, TransactionStatus, TransactionType};
use crate::wallet::DebitSettlement;

/// Applies invoice and withdraw requests as atomic units of work.
///
/// Every request runs inside one [`EscrowUnit`]: either all of its subwallet
/// and transaction writes become visible, or none do.
#[derive(Debug, Clone)]
pub struct EscrowEngine<S> {
    store: S,
}

impl<S: EscrowStore> EscrowEngine<S> {
    /// Create an engine over a store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Credit: escrow the amount, record the transaction, then move the whole
    /// frozen balance into the settled one.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn invoice(&self, request: &EscrowRequest) -> Result<EscrowOutcome, EscrowError> {
        self.apply(TransactionType::Invoice, request).await
    }

    /// Debit: hold the amount, record the transaction, then debit the
    /// settled balance if it covers the request.
    ///
    /// Insufficient funds is not an error: the transaction ends in status
    /// `Error` and both balances are left as they were.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn withdraw(&self, request: &EscrowRequest) -> Result<EscrowOutcome, EscrowError> {
        self.apply(TransactionType::Withdraw, request).await
    }

    /// Runs one request.
    ///
    /// A request whose idempotency key was already applied returns the
    /// recorded transaction with `replayed = true` and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The wallet does not exist
    /// - A withdrawal targets a currency without a subwallet
    /// - The key was already used for a different request
    /// - Storage fails (the unit is rolled back)
    pub async fn apply(
        &self,
        kind: TransactionType,
        request: &EscrowRequest,
    ) -> Result<EscrowOutcome, EscrowError> {
        let mut unit = self.store.begin().await?;

        if let Some(existing) = unit.find_by_request_key(request.key()).await? {
            ensure_same_request(&existing, kind, request)?;
            debug!(
                key = request.key(),
                transaction_id = %existing.id,
                "request already applied"
            );
            return Ok(EscrowOutcome {
                transaction: existing,
                replayed: true,
            });
        }

        if !unit.wallet_exists(request.wallet_id()).await? {
            return Err(EscrowError::WalletNotFound(request.wallet_id()));
        }

        let transaction = match kind {
            TransactionType::Invoice => run_invoice(&mut unit, request).await?,
            TransactionType::Withdraw => run_withdraw(&mut unit, request).await?,
        };
        unit.commit().await?;

        info!(
            transaction_id = %transaction.id,
            wallet_id = %transaction.wallet_id,
            currency = %transaction.currency,
            kind = %kind,
            amount = %transaction.amount,
            status = %transaction.status,
            "escrow unit committed"
        );
        Ok(EscrowOutcome {
            transaction,
            replayed: false,
        })
    }
}

fn ensure_same_request(
    existing: &TransactionRecord,
    kind: TransactionType,
    request: &EscrowRequest,
) -> Result<(), EscrowError> {
    let same = existing.transaction_type == kind
        && existing.wallet_id == request.wallet_id()
        && &existing.currency == request.currency()
        && existing.amount == request.amount();
    if same {
        Ok(())
    } else {
        Err(EscrowError::Validation(format!(
            "idempotency key {:?} already used by transaction {}",
            request.key(),
            existing.id
        )))
    }
}

fn new_transaction(kind: TransactionType, request: &EscrowRequest) -> NewTransaction {
    NewTransaction {
        wallet_id: request.wallet_id(),
        currency: request.currency().clone(),
        transaction_type: kind,
        amount: request.amount(),
        request_key: request.key().to_string(),
    }
}

async fn run_invoice<U: EscrowUnit>(
    unit: &mut U,
    request: &EscrowRequest,
) -> Result<TransactionRecord, EscrowError> {
    let mut subwallet = unit
        .lock_subwallet(request.wallet_id(), request.currency(), LockMode::CreateMissing)
        .await?
        .ok_or_else(|| {
            StorageError::new("escrow.lock_subwallet", "subwallet missing after upsert")
        })?;

    subwallet.reserve_credit(request.amount())?;
    unit.save_subwallet(&subwallet).await?;

    let created = unit
        .insert_transaction(new_transaction(TransactionType::Invoice, request))
        .await?;

    subwallet.settle_credit()?;
    unit.save_subwallet(&subwallet).await?;

    Ok(unit.set_status(created.id, TransactionStatus::Success).await?)
}

async fn run_withdraw<U: EscrowUnit>(
    unit: &mut U,
    request: &EscrowRequest,
) -> Result<TransactionRecord, EscrowError> {
    let Some(mut subwallet) = unit
        .lock_subwallet(request.wallet_id(), request.currency(), LockMode::ExistingOnly)
        .await?
    else {
        return Err(EscrowError::SubwalletNotFound {
            wallet_id: request.wallet_id(),
            currency: request.currency().clone(),
        });
    };

    let hold = subwallet.reserve_debit(request.amount())?;
    unit.save_subwallet(&subwallet).await?;

    let created = unit
        .insert_transaction(new_transaction(TransactionType::Withdraw, request))
        .await?;

    let status = match subwallet.settle_debit(hold) {
        DebitSettlement::Settled => TransactionStatus::Success,
        DebitSettlement::InsufficientFunds { available } => {
            info!(
                transaction_id = %created.id,
                requested = %request.amount(),
                %available,
                "insufficient funds, hold released"
            );
            TransactionStatus::Error
        }
    };
    unit.save_subwallet(&subwallet).await?;

    Ok(unit.set_status(created.id, status).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use purse_shared::types::{CurrencyCode, WalletId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::ledger::{LedgerError, TransactionLedger};
    use crate::memory::MemoryStore;
    use crate::wallet::WalletStore;

    fn code(raw: &str) -> CurrencyCode {
        CurrencyCode::parse(raw).unwrap()
    }

    fn request(wallet_id: WalletId, currency: &str, amount: Decimal, key: &str) -> EscrowRequest {
        EscrowRequest::new(wallet_id, code(currency), amount, key).unwrap()
    }

    async fn setup() -> (EscrowEngine<MemoryStore>, WalletId) {
        let store = MemoryStore::new();
        let wallet = store.create_wallet().await.unwrap();
        (EscrowEngine::new(store), wallet.id)
    }

    async fn funded(amount: Decimal) -> (EscrowEngine<MemoryStore>, WalletId) {
        let (engine, wallet_id) = setup().await;
        engine
            .invoice(&request(wallet_id, "USD", amount, "seed"))
            .await
            .unwrap();
        (engine, wallet_id)
    }

    #[tokio::test]
    async fn test_invoice_creates_subwallet_and_settles() {
        let (engine, wallet_id) = setup().await;

        let outcome = engine
            .invoice(&request(wallet_id, "USD", dec!(100), "inv-1"))
            .await
            .unwrap();
        assert!(!outcome.replayed);
        assert_eq!(outcome.transaction.status, TransactionStatus::Success);
        assert_eq!(outcome.transaction.transaction_type, TransactionType::Invoice);

        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].currency.as_str(), "USD");
        assert_eq!(balances[0].amount, dec!(100));
        assert_eq!(balances[0].frozen_amount, dec!(0));
    }

    #[tokio::test]
    async fn test_invoice_round_trip_through_ledger() {
        let (engine, wallet_id) = setup().await;
        let outcome = engine
            .invoice(&request(wallet_id, "USD", dec!(12.50), "inv-1"))
            .await
            .unwrap();

        let stored = engine
            .store()
            .get_transaction(outcome.transaction.id)
            .await
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
        assert_eq!(stored.amount, dec!(12.50));
        assert_eq!(stored.wallet_id, wallet_id);
    }

    #[tokio::test]
    async fn test_concurrent_invoices_on_same_subwallet() {
        let (engine, wallet_id) = setup().await;
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .invoice(&request(wallet_id, "USD", dec!(50), &format!("inv-{i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances[0].amount, dec!(100));
        assert_eq!(balances[0].frozen_amount, dec!(0));
    }

    #[tokio::test]
    async fn test_withdraw_without_subwallet_records_nothing() {
        let (engine, wallet_id) = funded(dec!(100)).await;
        let before = engine.store().transaction_count();

        let err = engine
            .withdraw(&request(wallet_id, "EUR", dec!(10), "wd-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::SubwalletNotFound { .. }));
        assert_eq!(engine.store().transaction_count(), before);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds() {
        let (engine, wallet_id) = funded(dec!(100)).await;

        let outcome = engine
            .withdraw(&request(wallet_id, "USD", dec!(150), "wd-1"))
            .await
            .unwrap();
        assert_eq!(outcome.transaction.status, TransactionStatus::Error);

        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances[0].amount, dec!(100));
        assert_eq!(balances[0].frozen_amount, dec!(0));
    }

    #[tokio::test]
    async fn test_withdraw_sufficient_funds() {
        let (engine, wallet_id) = funded(dec!(100)).await;

        let outcome = engine
            .withdraw(&request(wallet_id, "USD", dec!(50), "wd-1"))
            .await
            .unwrap();
        assert_eq!(outcome.transaction.status, TransactionStatus::Success);

        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances[0].amount, dec!(50));
        assert_eq!(balances[0].frozen_amount, dec!(0));
    }

    #[tokio::test]
    async fn test_unknown_wallet() {
        let (engine, _) = setup().await;
        let missing = WalletId::new();

        let err = engine
            .invoice(&request(missing, "USD", dec!(1), "inv-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::WalletNotFound(id) if id == missing));
        assert_eq!(engine.store().transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_replay_returns_same_transaction() {
        let (engine, wallet_id) = setup().await;
        let req = request(wallet_id, "USD", dec!(40), "inv-1");

        let first = engine.invoice(&req).await.unwrap();
        let second = engine.invoice(&req).await.unwrap();

        assert!(second.replayed);
        assert_eq!(second.transaction, first.transaction);
        assert_eq!(engine.store().transaction_count(), 1);
        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances[0].amount, dec!(40));
    }

    #[tokio::test]
    async fn test_reused_key_for_different_request_is_rejected() {
        let (engine, wallet_id) = funded(dec!(100)).await;

        let err = engine
            .withdraw(&request(wallet_id, "USD", dec!(100), "seed"))
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::Validation(_)));
        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        assert_eq!(balances[0].amount, dec!(100));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_state() {
        let (engine, wallet_id) = setup().await;
        engine.store().fail_next_commits(1);

        let req = request(wallet_id, "USD", dec!(25), "inv-1");
        let err = engine.invoice(&req).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(engine.store().get_balance(wallet_id).await.unwrap().is_empty());
        assert_eq!(engine.store().transaction_count(), 0);

        let outcome = engine.invoice(&req).await.unwrap();
        assert!(!outcome.replayed);
        assert_eq!(outcome.transaction.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_settled_transaction_cannot_be_changed() {
        let (engine, wallet_id) = setup().await;
        let outcome = engine
            .invoice(&request(wallet_id, "USD", dec!(5), "inv-1"))
            .await
            .unwrap();

        let err = engine
            .store()
            .set_status(outcome.transaction.id, TransactionStatus::Error)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_currencies_are_independent() {
        let (engine, wallet_id) = funded(dec!(100)).await;
        engine
            .invoice(&request(wallet_id, "EUR", dec!(30), "inv-eur"))
            .await
            .unwrap();
        engine
            .withdraw(&request(wallet_id, "EUR", dec!(10), "wd-eur"))
            .await
            .unwrap();

        let balances = engine.store().get_balance(wallet_id).await.unwrap();
        let amounts: Vec<_> = balances
            .iter()
            .map(|s| (s.currency.as_str().to_string(), s.amount))
            .collect();
        assert_eq!(
            amounts,
            vec![("EUR".to_string(), dec!(20)), ("USD".to_string(), dec!(100))]
        );
    }
}
