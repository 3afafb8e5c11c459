//! Wallet creation and balance routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use purse_core::queue::MessageQueue;
use purse_core::wallet::{Subwallet, WalletStore};
use purse_shared::types::{CurrencyCode, WalletId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::{ApiError, AppState, BillingStore};

/// Creates the wallet routes.
pub fn routes<S, Q>() -> Router<AppState<S, Q>>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    Router::new()
        .route("/wallet", post(create_wallet::<S, Q>))
        .route("/balance/{id}", get(get_balance::<S, Q>))
}

/// Response for a newly created wallet.
#[derive(Debug, Serialize)]
pub struct WalletCreatedResponse {
    /// Wallet identifier.
    pub wallet_id: WalletId,
    /// Account identifier handed to the owner.
    pub account_id: String,
}

/// One currency partition of a wallet balance.
#[derive(Debug, Serialize)]
pub struct BalanceEntry {
    /// Owning wallet.
    pub wallet_id: WalletId,
    /// Currency code.
    pub currency: CurrencyCode,
    /// Settled balance.
    pub amount: Decimal,
    /// Escrowed balance.
    pub frozen_amount: Decimal,
}

impl From<Subwallet> for BalanceEntry {
    fn from(sub: Subwallet) -> Self {
        Self {
            wallet_id: sub.wallet_id,
            currency: sub.currency,
            amount: sub.amount,
            frozen_amount: sub.frozen_amount,
        }
    }
}

/// Response for a balance lookup.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// One entry per currency the wallet holds.
    pub balances: Vec<BalanceEntry>,
}

/// POST `/wallet` - Create a wallet.
async fn create_wallet<S, Q>(
    State(state): State<AppState<S, Q>>,
) -> Result<(StatusCode, Json<WalletCreatedResponse>), ApiError>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    let wallet = state.store.create_wallet().await?;
    info!(wallet_id = %wallet.id, account_id = %wallet.account_id, "Wallet created");

    Ok((
        StatusCode::CREATED,
        Json(WalletCreatedResponse {
            wallet_id: wallet.id,
            account_id: wallet.account_id,
        }),
    ))
}

/// GET `/balance/{id}` - List the per-currency balances of a wallet.
async fn get_balance<S, Q>(
    State(state): State<AppState<S, Q>>,
    Path(id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    let wallet_id: WalletId = id
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid wallet id: {id}")))?;

    let balances = state.store.get_balance(wallet_id).await?;
    Ok(Json(BalanceResponse {
        balances: balances.into_iter().map(BalanceEntry::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use purse_core::escrow::{EscrowEngine, EscrowRequest};
    use purse_core::wallet::WalletStore;
    use purse_shared::types::{CurrencyCode, WalletId};
    use rust_decimal_macros::dec;

    use crate::testing::{get, json, post_json, send, state};

    #[tokio::test]
    async fn test_create_wallet() {
        let state = state();
        let response = send(&state, post_json("/wallet", "")).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json(response).await;
        assert!(body["account_id"].as_str().unwrap().starts_with("ACC-"));

        let wallet_id: WalletId = body["wallet_id"].as_str().unwrap().parse().unwrap();
        assert!(state.store.get_balance(wallet_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_lists_currencies() {
        let state = state();
        let wallet = state.store.create_wallet().await.unwrap();
        let engine = EscrowEngine::new(state.store.clone());
        for (currency, amount, key) in [("USD", dec!(100), "a"), ("EUR", dec!(5), "b")] {
            let request = EscrowRequest::new(
                wallet.id,
                CurrencyCode::parse(currency).unwrap(),
                amount,
                key,
            )
            .unwrap();
            engine.invoice(&request).await.unwrap();
        }

        let response = send(&state, get(&format!("/balance/{}", wallet.id))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        let balances = body["balances"].as_array().unwrap();
        assert_eq!(balances.len(), 2);
        let usd = balances
            .iter()
            .find(|entry| entry["currency"] == "USD")
            .unwrap();
        assert_eq!(usd["wallet_id"], wallet.id.to_string());
        assert_eq!(usd["amount"], "100");
        assert_eq!(usd["frozen_amount"], "0");
    }

    #[tokio::test]
    async fn test_balance_of_unknown_wallet() {
        let response = send(&state(), get(&format!("/balance/{}", WalletId::new()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_balance_with_malformed_id() {
        let response = send(&state(), get("/balance/not-a-uuid")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "VALIDATION_ERROR");
    }
}
