//! Escrow unit of work on a PostgreSQL transaction.
//!
//! Subwallet rows are locked with `SELECT ... FOR UPDATE`; a missing row is
//! first created with `INSERT ... ON CONFLICT DO NOTHING` so that concurrent
//! first invoices for the same currency converge on one row.

use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    Set, TransactionTrait,
};

use purse_core::StorageError;
use purse_core::escrow::{EscrowStore, EscrowUnit, LockMode};
use purse_core::ledger::{LedgerError, NewTransaction, TransactionRecord, TransactionStatus};
use purse_core::wallet::Subwallet;
use purse_shared::types::{CurrencyCode, TransactionId, WalletId};

use super::{PgStore, transaction, wallet};
use crate::entities::{subwallets, transactions};

impl EscrowStore for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StorageError::new("escrow.begin", e))?;
        Ok(PgUnit { txn })
    }
}

/// An open database transaction. Dropping it rolls back.
#[derive(Debug)]
pub struct PgUnit {
    txn: DatabaseTransaction,
}

impl EscrowUnit for PgUnit {
    async fn find_by_request_key(
        &mut self,
        key: &str,
    ) -> Result<Option<TransactionRecord>, StorageError> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::RequestKey.eq(key))
            .one(&self.txn)
            .await
            .map_err(|e| StorageError::new("escrow.find_by_request_key", e))?;
        model.map(transaction::to_domain).transpose()
    }

    async fn wallet_exists(&mut self, wallet_id: WalletId) -> Result<bool, StorageError> {
        wallet::wallet_exists(&self.txn, wallet_id).await
    }

    async fn lock_subwallet(
        &mut self,
        wallet_id: WalletId,
        currency: &CurrencyCode,
        mode: LockMode,
    ) -> Result<Option<Subwallet>, StorageError> {
        if mode == LockMode::CreateMissing {
            subwallets::Entity::insert(subwallets::ActiveModel {
                wallet_id: Set(wallet_id.into_inner()),
                currency: Set(currency.as_str().to_string()),
                amount: Set(Decimal::ZERO),
                frozen_amount: Set(Decimal::ZERO),
            })
            .on_conflict(
                OnConflict::columns([subwallets::Column::WalletId, subwallets::Column::Currency])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| StorageError::new("escrow.lock_subwallet", e))?;
        }

        let model = subwallets::Entity::find_by_id((
            wallet_id.into_inner(),
            currency.as_str().to_string(),
        ))
        .lock_exclusive()
        .one(&self.txn)
        .await
        .map_err(|e| StorageError::new("escrow.lock_subwallet", e))?;

        model.map(wallet::to_domain).transpose()
    }

    async fn save_subwallet(&mut self, subwallet: &Subwallet) -> Result<(), StorageError> {
        wallet::to_active_model(subwallet)
            .update(&self.txn)
            .await
            .map_err(|e| StorageError::new("escrow.save_subwallet", e))?;
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        transaction::insert(&self.txn, new).await
    }

    async fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        transaction::set_status(&self.txn, id, status).await
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.txn
            .commit()
            .await
            .map_err(|e| StorageError::new("escrow.commit", e))
    }
}
