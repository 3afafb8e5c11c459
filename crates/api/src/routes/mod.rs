//! API route definitions.

use axum::Router;
use purse_core::queue::MessageQueue;

use crate::{AppState, BillingStore};

pub mod health;
pub mod requests;
pub mod transactions;
pub mod wallets;

/// Creates the billing API router with all routes.
pub fn api_routes<S, Q>() -> Router<AppState<S, Q>>
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    Router::new()
        .merge(health::routes())
        .merge(wallets::routes())
        .merge(transactions::routes())
        .merge(requests::routes::<AppState<S, Q>, Q>())
}
