//! Transaction lookup routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use purse_core::ledger::{TransactionLedger, TransactionRecord, TransactionStatus, TransactionType};
use purse_core::queue::MessageQueue;
use purse_shared::types::{CurrencyCode, TransactionId, WalletId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{ApiError, AppState, BillingStore};

/// Creates the transaction routes.
pub fn routes<S, Q>() -> Router<AppState<S, Q>>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    Router::new().route("/transaction/{id}", get(get_transaction::<S, Q>))
}

/// Transaction as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Wallet the operation applied to.
    pub wallet_id: WalletId,
    /// `Invoice` or `Withdraw`.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Currency code.
    pub currency: CurrencyCode,
    /// Requested amount.
    pub amount: Decimal,
    /// Creation time.
    pub date_created: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionView {
    fn from(tx: TransactionRecord) -> Self {
        Self {
            id: tx.id,
            wallet_id: tx.wallet_id,
            transaction_type: tx.transaction_type,
            status: tx.status,
            currency: tx.currency,
            amount: tx.amount,
            date_created: tx.date_created,
        }
    }
}

/// Response for a transaction lookup.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// The transaction.
    pub transaction: TransactionView,
}

/// GET `/transaction/{id}` - Fetch one transaction.
async fn get_transaction<S, Q>(
    State(state): State<AppState<S, Q>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    let id: TransactionId = id
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid transaction id: {id}")))?;

    let transaction = state.store.get_transaction(id).await?;
    Ok(Json(TransactionResponse {
        transaction: transaction.into(),
    }))
}
