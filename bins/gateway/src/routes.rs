//! Gateway router.
//!
//! Invoice and withdraw requests are queued directly; every read is
//! forwarded to the billing server and its response passed through.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{FromRef, State},
    http::{Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use purse_api::ApiError;
use purse_api::routes::{health, requests};
use purse_core::queue::MessageQueue;
use purse_shared::AppError;
use tracing::{debug, error};

/// Gateway state.
pub struct GatewayState<Q> {
    /// Request queue shared with the billing consumers.
    pub queue: Arc<Q>,
    /// Client for the billing read API.
    pub client: reqwest::Client,
    /// Billing base URL without a trailing slash.
    pub billing_url: Arc<str>,
}

impl<Q> GatewayState<Q> {
    /// Creates the state, normalizing `billing_url`.
    pub fn new(queue: Arc<Q>, client: reqwest::Client, billing_url: &str) -> Self {
        Self {
            queue,
            client,
            billing_url: billing_url.trim_end_matches('/').into(),
        }
    }
}

impl<Q> Clone for GatewayState<Q> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            client: self.client.clone(),
            billing_url: Arc::clone(&self.billing_url),
        }
    }
}

impl<Q> FromRef<GatewayState<Q>> for Arc<Q> {
    fn from_ref(state: &GatewayState<Q>) -> Self {
        Arc::clone(&state.queue)
    }
}

/// Creates the gateway router.
pub fn create_router<Q: MessageQueue + 'static>(state: GatewayState<Q>) -> Router {
    let router = Router::new()
        .merge(health::routes())
        .merge(requests::routes::<GatewayState<Q>, Q>())
        .route("/wallet", post(proxy::<Q>))
        .route("/balance/{id}", get(proxy::<Q>))
        .route("/transaction/{id}", get(proxy::<Q>))
        .with_state(state);
    purse_api::with_http_layers(router)
}

/// Forwards the request to the same path on the billing server.
async fn proxy<Q: MessageQueue + 'static>(
    State(state): State<GatewayState<Q>>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    let path = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    let url = format!("{}{path}", state.billing_url);
    debug!(%method, %url, "Proxying to billing");

    let upstream = state
        .client
        .request(method, &url)
        .send()
        .await
        .map_err(upstream_error)?;
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let body = upstream.bytes().await.map_err(upstream_error)?;

    let mut response = (status, Body::from(body)).into_response();
    if let Some(value) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}

fn upstream_error(err: reqwest::Error) -> ApiError {
    error!(error = %err, "Billing request failed");
    ApiError(AppError::Upstream(err.to_string()))
}
