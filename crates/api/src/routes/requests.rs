//! Invoice and withdraw request routes.
//!
//! Requests are validated and published to their topic; the escrow engine
//! applies them asynchronously. A 202 response means the request is queued,
//! not settled. Clients poll `/transaction/{id}` or `/balance/{id}` for the
//! outcome.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use purse_core::queue::{MessageQueue, RequestPayload, Topic, publish_request};
use serde::Serialize;
use tracing::info;

use crate::ApiError;

/// Creates the request routes for any state that exposes the queue.
pub fn routes<T, Q>() -> Router<T>
where
    T: Clone + Send + Sync + 'static,
    Q: MessageQueue + 'static,
    Arc<Q>: FromRef<T>,
{
    Router::new()
        .route("/invoice", post(publish_invoice::<Q>))
        .route("/withdraw", post(publish_withdraw::<Q>))
}

/// Response for an accepted request: the payload echoed with its message id.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// The request as queued.
    #[serde(flatten)]
    pub request: RequestPayload,
    /// Queue message identifier.
    pub message_id: i64,
}

/// POST `/invoice` - Queue a credit.
async fn publish_invoice<Q: MessageQueue + 'static>(
    State(queue): State<Arc<Q>>,
    body: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    enqueue(queue.as_ref(), Topic::Invoices, body).await
}

/// POST `/withdraw` - Queue a debit.
async fn publish_withdraw<Q: MessageQueue + 'static>(
    State(queue): State<Arc<Q>>,
    body: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    enqueue(queue.as_ref(), Topic::Withdrawals, body).await
}

/// Validates a request body and publishes it to `topic`.
///
/// # Errors
///
/// Returns a validation error for an unreadable or invalid body and a queue
/// error if publishing fails.
pub async fn enqueue<Q: MessageQueue>(
    queue: &Q,
    topic: Topic,
    body: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let Json(payload) = body.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    payload.validate()?;

    let message_id = publish_request(queue, topic, &payload).await?;
    info!(
        topic = %topic,
        message_id,
        wallet_id = %payload.wallet_id,
        currency = %payload.currency,
        "Request queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            request: payload,
            message_id,
        }),
    ))
}
