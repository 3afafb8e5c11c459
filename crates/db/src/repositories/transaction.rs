//! Transaction ledger repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, NotSet, QuerySelect, Set, TransactionTrait,
};

use purse_core::StorageError;
use purse_core::ledger::{
    LedgerError, NewTransaction, TransactionLedger, TransactionRecord, TransactionStatus,
    TransactionType,
};
use purse_shared::types::{CurrencyCode, TransactionId, WalletId};

use super::PgStore;
use crate::entities::transactions;

impl TransactionLedger for PgStore {
    async fn create_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        insert(&self.db, new).await
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StorageError::new("ledger.set_status", e))?;

        let record = set_status(&txn, id, status).await?;

        txn.commit()
            .await
            .map_err(|e| StorageError::new("ledger.set_status", e))?;
        Ok(record)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| StorageError::new("ledger.get", e))?
            .ok_or(LedgerError::NotFound(id))?;
        Ok(to_domain(model)?)
    }
}

/// Inserts a `Created` transaction on any connection or transaction.
pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    new: NewTransaction,
) -> Result<TransactionRecord, LedgerError> {
    let model = transactions::ActiveModel {
        id: NotSet,
        wallet_id: Set(new.wallet_id.into_inner()),
        currency: Set(new.currency.as_str().to_string()),
        transaction_type: Set(new.transaction_type.as_str().to_string()),
        amount: Set(new.amount),
        status: Set(TransactionStatus::Created.as_str().to_string()),
        request_key: Set(new.request_key),
        date_created: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(|e| StorageError::new("ledger.insert", e))?;

    Ok(to_domain(model)?)
}

/// Locks the row, checks the transition and writes the new status.
pub(crate) async fn set_status<C: ConnectionTrait>(
    conn: &C,
    id: TransactionId,
    status: TransactionStatus,
) -> Result<TransactionRecord, LedgerError> {
    let model = transactions::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(|e| StorageError::new("ledger.set_status", e))?
        .ok_or(LedgerError::NotFound(id))?;

    let mut record = to_domain(model)?;
    record.transition_to(status)?;

    transactions::ActiveModel {
        id: Set(id.into_inner()),
        status: Set(status.as_str().to_string()),
        ..Default::default()
    }
    .update(conn)
    .await
    .map_err(|e| StorageError::new("ledger.set_status", e))?;

    Ok(record)
}

/// Convert a transaction row to the domain record.
pub(crate) fn to_domain(model: transactions::Model) -> Result<TransactionRecord, StorageError> {
    let decode = |e: String| StorageError::new("ledger.decode", e);
    Ok(TransactionRecord {
        id: TransactionId(model.id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        currency: CurrencyCode::parse(&model.currency)
            .map_err(|e| StorageError::new("ledger.decode", e))?,
        transaction_type: model.transaction_type.parse::<TransactionType>().map_err(decode)?,
        amount: model.amount,
        status: model.status.parse::<TransactionStatus>().map_err(decode)?,
        request_key: model.request_key,
        date_created: model.date_created.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn model(transaction_type: &str, status: &str) -> transactions::Model {
        transactions::Model {
            id: 9,
            wallet_id: Uuid::now_v7(),
            currency: "EUR".to_string(),
            transaction_type: transaction_type.to_string(),
            amount: dec!(3.25),
            status: status.to_string(),
            request_key: "withdrawals:9".to_string(),
            date_created: Utc::now().into(),
        }
    }

    #[test]
    fn test_to_domain() {
        let record = to_domain(model("Withdraw", "Error")).unwrap();
        assert_eq!(record.id, TransactionId(9));
        assert_eq!(record.transaction_type, TransactionType::Withdraw);
        assert_eq!(record.status, TransactionStatus::Error);
        assert_eq!(record.amount, dec!(3.25));
    }

    #[test]
    fn test_unknown_status_is_storage_error() {
        let err = to_domain(model("Invoice", "Pending")).unwrap_err();
        assert_eq!(err.op, "ledger.decode");
        assert!(err.message.contains("Pending"));
    }
}
