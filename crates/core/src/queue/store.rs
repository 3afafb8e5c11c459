//! Queue trait.

use std::future::Future;
use std::time::Duration;

use super::error::QueueError;
use super::types::{Delivery, RequestPayload, Topic};

/// A durable, per-topic FIFO queue with leased deliveries.
///
/// Implemented by the db crate on PostgreSQL and by
/// [`crate::memory::MemoryQueue`] for tests.
pub trait MessageQueue: Send + Sync {
    /// Appends a message and returns its id.
    fn publish(
        &self,
        topic: Topic,
        payload: String,
    ) -> impl Future<Output = Result<i64, QueueError>> + Send;

    /// Claims the oldest pending message of a topic.
    ///
    /// Returns `None` if the topic is empty or its head message is leased or
    /// backing off; later messages are never handed out ahead of the head.
    fn fetch(&self, topic: Topic)
    -> impl Future<Output = Result<Option<Delivery>, QueueError>> + Send;

    /// Marks a delivery as processed, with an optional note.
    fn commit(
        &self,
        delivery: &Delivery,
        note: Option<&str>,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Releases a delivery for redelivery after `delay`.
    fn retry(
        &self,
        delivery: &Delivery,
        error: &str,
        delay: Duration,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Moves a delivery to the dead-letter state.
    fn dead_letter(
        &self,
        delivery: &Delivery,
        reason: &str,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;
}

/// Serializes and publishes a request payload.
///
/// # Errors
///
/// Returns `QueueError::Publish` if serialization or the queue fails.
pub async fn publish_request<Q: MessageQueue>(
    queue: &Q,
    topic: Topic,
    payload: &RequestPayload,
) -> Result<i64, QueueError> {
    let body = serde_json::to_string(payload).map_err(|e| QueueError::Publish {
        topic,
        message: e.to_string(),
    })?;
    queue.publish(topic, body).await
}
