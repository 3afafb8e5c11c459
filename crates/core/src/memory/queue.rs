//! In-memory message queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::queue::{Delivery, MessageQueue, MessageState, QueueError, Topic};

/// A message as held by [`MemoryQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Message id.
    pub id: i64,
    /// Topic.
    pub topic: Topic,
    /// Raw payload.
    pub payload: String,
    /// Current state.
    pub state: MessageState,
    /// Deliveries so far.
    pub attempts: u32,
    /// Earliest time the message may be delivered again.
    pub available_at: Instant,
    /// Note left by the last commit, retry or dead-letter.
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: Vec<StoredMessage>,
    next_id: i64,
}

/// Queue backed by process memory, with the same lease semantics as the
/// PostgreSQL queue.
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
    lease: Duration,
    fail_publish: Arc<AtomicBool>,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl MemoryQueue {
    /// Creates an empty queue whose deliveries are leased for `lease`.
    #[must_use]
    pub fn new(lease: Duration) -> Self {
        Self {
            state: Arc::default(),
            lease,
            fail_publish: Arc::default(),
        }
    }

    /// Makes every publish fail until reset.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of one message.
    #[must_use]
    pub fn message(&self, id: i64) -> Option<StoredMessage> {
        self.lock().messages.iter().find(|m| m.id == id).cloned()
    }

    /// Snapshot of every message of a topic, in publish order.
    #[must_use]
    pub fn messages(&self, topic: Topic) -> Vec<StoredMessage> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(
        &self,
        delivery: &Delivery,
        apply: impl FnOnce(&mut StoredMessage),
    ) -> Result<(), QueueError> {
        let mut state = self.lock();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == delivery.id && m.state == MessageState::Pending)
            .ok_or_else(|| QueueError::Consume {
                topic: delivery.topic,
                message: format!("message {} is not pending", delivery.id),
            })?;
        apply(message);
        Ok(())
    }
}

impl MessageQueue for MemoryQueue {
    async fn publish(&self, topic: Topic, payload: String) -> Result<i64, QueueError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(QueueError::Publish {
                topic,
                message: "queue unavailable".to_string(),
            });
        }
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.messages.push(StoredMessage {
            id,
            topic,
            payload,
            state: MessageState::Pending,
            attempts: 0,
            available_at: Instant::now(),
            last_error: None,
        });
        Ok(id)
    }

    async fn fetch(&self, topic: Topic) -> Result<Option<Delivery>, QueueError> {
        let now = Instant::now();
        let lease = self.lease;
        let mut state = self.lock();
        let Some(head) = state
            .messages
            .iter_mut()
            .find(|m| m.topic == topic && m.state == MessageState::Pending)
        else {
            return Ok(None);
        };
        if head.available_at > now {
            return Ok(None);
        }
        head.attempts += 1;
        head.available_at = now + lease;
        Ok(Some(Delivery {
            id: head.id,
            topic,
            payload: head.payload.clone(),
            attempt: head.attempts,
        }))
    }

    async fn commit(&self, delivery: &Delivery, note: Option<&str>) -> Result<(), QueueError> {
        self.update(delivery, |m| {
            m.state = MessageState::Committed;
            m.last_error = note.map(str::to_string);
        })
    }

    async fn retry(
        &self,
        delivery: &Delivery,
        error: &str,
        delay: Duration,
    ) -> Result<(), QueueError> {
        self.update(delivery, |m| {
            m.available_at = Instant::now() + delay;
            m.last_error = Some(error.to_string());
        })
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError> {
        self.update(delivery, |m| {
            m.state = MessageState::Dead;
            m.last_error = Some(reason.to_string());
        })
    }
}
