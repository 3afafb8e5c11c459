//! Queue consumers driving the escrow engine.
//!
//! One [`RequestConsumer`] runs per topic. Each processes its messages one
//! at a time in publish order and acknowledges a message only after the
//! escrow unit has finished, so delivery is at least once and redeliveries
//! are absorbed as replays by the idempotency key.

use std::sync::Arc;
use std::time::Duration;

use purse_shared::config::QueueConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::escrow::{EscrowEngine, EscrowError, EscrowOutcome, EscrowStore};
use crate::queue::{Delivery, MessageQueue, QueueError, Topic};

/// Consumer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Sleep between polls of an empty topic.
    pub poll_interval: Duration,
    /// Deliveries after which a retryable failure is dead-lettered.
    pub max_attempts: u32,
    /// Base redelivery delay, multiplied by the attempt number.
    pub retry_backoff: Duration,
    /// Upper bound for one escrow unit.
    pub unit_timeout: Duration,
}

impl From<&QueueConfig> for ConsumerSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
            unit_timeout: config.unit_timeout(),
        }
    }
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was available.
    Idle,
    /// The message was applied, replayed, or rejected for good.
    Committed,
    /// The message was released for redelivery.
    Retried,
    /// The message was moved to the dead-letter state.
    DeadLettered,
}

/// Consumes one topic and applies its requests.
pub struct RequestConsumer<Q, S> {
    topic: Topic,
    queue: Arc<Q>,
    engine: Arc<EscrowEngine<S>>,
    settings: ConsumerSettings,
}

impl<Q: MessageQueue, S: EscrowStore> RequestConsumer<Q, S> {
    /// Create a consumer for `topic`.
    #[must_use]
    pub const fn new(
        topic: Topic,
        queue: Arc<Q>,
        engine: Arc<EscrowEngine<S>>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            topic,
            queue,
            engine,
            settings,
        }
    }

    /// Topic this consumer reads.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Fetches and handles at most one message.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the queue itself fails. Engine failures are
    /// handled here and never returned.
    pub async fn poll_once(&self) -> Result<PollOutcome, QueueError> {
        let Some(delivery) = self.queue.fetch(self.topic).await? else {
            return Ok(PollOutcome::Idle);
        };

        let request = match delivery.decode() {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    topic = %self.topic,
                    message_id = delivery.id,
                    error = %err,
                    "dead-lettering malformed message"
                );
                self.queue.dead_letter(&delivery, &err.to_string()).await?;
                return Ok(PollOutcome::DeadLettered);
            }
        };

        let applied = tokio::time::timeout(
            self.settings.unit_timeout,
            self.engine.apply(self.topic.operation(), &request),
        )
        .await
        .unwrap_or(Err(EscrowError::Timeout(self.settings.unit_timeout)));

        match applied {
            Ok(outcome) => {
                self.log_applied(&delivery, &outcome);
                self.queue.commit(&delivery, None).await?;
                Ok(PollOutcome::Committed)
            }
            Err(err) if err.is_retryable() => self.handle_retryable(&delivery, &err).await,
            Err(err) => {
                warn!(
                    topic = %self.topic,
                    message_id = delivery.id,
                    error = %err,
                    "request rejected"
                );
                self.queue
                    .commit(&delivery, Some(&err.to_string()))
                    .await?;
                Ok(PollOutcome::Committed)
            }
        }
    }

    async fn handle_retryable(
        &self,
        delivery: &Delivery,
        err: &EscrowError,
    ) -> Result<PollOutcome, QueueError> {
        if delivery.attempt >= self.settings.max_attempts {
            error!(
                topic = %self.topic,
                message_id = delivery.id,
                attempt = delivery.attempt,
                error = %err,
                "giving up on message"
            );
            self.queue.dead_letter(delivery, &err.to_string()).await?;
            return Ok(PollOutcome::DeadLettered);
        }

        let delay = self.settings.retry_backoff.saturating_mul(delivery.attempt);
        warn!(
            topic = %self.topic,
            message_id = delivery.id,
            attempt = delivery.attempt,
            retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "request failed, will retry"
        );
        self.queue.retry(delivery, &err.to_string(), delay).await?;
        Ok(PollOutcome::Retried)
    }

    fn log_applied(&self, delivery: &Delivery, outcome: &EscrowOutcome) {
        if outcome.replayed {
            info!(
                topic = %self.topic,
                message_id = delivery.id,
                transaction_id = %outcome.transaction.id,
                "duplicate delivery, request already applied"
            );
        } else {
            debug!(
                topic = %self.topic,
                message_id = delivery.id,
                transaction_id = %outcome.transaction.id,
                status = %outcome.transaction.status,
                "message processed"
            );
        }
    }

    /// Polls until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between messages, so a unit that has
    /// started always completes before this returns.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(topic = %self.topic, "consumer started");
        while !shutdown.is_cancelled() {
            let idle = match self.poll_once().await {
                Ok(PollOutcome::Idle) => true,
                Ok(_) => false,
                Err(err) => {
                    error!(topic = %self.topic, error = %err, "queue poll failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.settings.poll_interval) => {}
                }
            }
        }
        info!(topic = %self.topic, "consumer stopped");
    }
}
