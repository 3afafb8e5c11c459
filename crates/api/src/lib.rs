//! HTTP API layer with Axum routes and error mapping.
//!
//! This crate provides:
//! - REST routes for wallets, balances, transactions and queued requests
//! - `ApiError`, mapping every domain error kind to its own status code
//! - The router shared by the billing server and the gateway
//! - Tracing and shutdown-signal setup for both binaries
//!
//! Handlers are generic over the store and queue traits from `purse-core`,
//! so the same router runs on PostgreSQL and on the in-memory doubles.

pub mod error;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use purse_core::ledger::TransactionLedger;
use purse_core::queue::MessageQueue;
use purse_core::wallet::WalletStore;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use telemetry::{init_tracing, shutdown_signal};

/// Storage the billing routes read and write through.
pub trait BillingStore: WalletStore + TransactionLedger + Clone + 'static {}

impl<T> BillingStore for T where T: WalletStore + TransactionLedger + Clone + 'static {}

/// Application state shared across handlers.
pub struct AppState<S, Q> {
    /// Wallet and transaction storage.
    pub store: S,
    /// Request queue consumed by the escrow engine.
    pub queue: Arc<Q>,
}

impl<S: Clone, Q> Clone for AppState<S, Q> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<S, Q> FromRef<AppState<S, Q>> for Arc<Q> {
    fn from_ref(state: &AppState<S, Q>) -> Self {
        Arc::clone(&state.queue)
    }
}

/// Wraps a router with request ids, tracing and permissive CORS.
pub fn with_http_layers(router: Router) -> Router {
    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Creates the billing server router.
pub fn create_router<S, Q>(state: AppState<S, Q>) -> Router
where
    S: BillingStore,
    Q: MessageQueue + 'static,
{
    with_http_layers(routes::api_routes().with_state(state))
}
