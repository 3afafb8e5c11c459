//! Durable request queue on the `queue_messages` table.
//!
//! A fetch locks the head pending message of a topic, and only claims it if
//! its lease has expired. Later messages are never claimed ahead of the head,
//! which keeps every topic strictly ordered even with several consumers.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use purse_core::queue::{Delivery, MessageQueue, MessageState, QueueError, Topic};

use crate::entities::queue_messages;

/// PostgreSQL-backed [`MessageQueue`].
#[derive(Debug, Clone)]
pub struct PgQueue {
    db: DatabaseConnection,
    lease: Duration,
}

impl PgQueue {
    /// Creates a queue whose deliveries are leased for `lease`.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lease: Duration) -> Self {
        Self { db, lease }
    }

    /// Reads one message, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message(&self, id: i64) -> Result<Option<queue_messages::Model>, sea_orm::DbErr> {
        queue_messages::Entity::find_by_id(id).one(&self.db).await
    }

    async fn finish(
        &self,
        delivery: &Delivery,
        state: MessageState,
        note: Option<&str>,
        available_at: Option<DateTime<Utc>>,
    ) -> Result<(), QueueError> {
        let consume_err = |message: String| QueueError::Consume {
            topic: delivery.topic,
            message,
        };

        let mut update = queue_messages::Entity::update_many()
            .col_expr(queue_messages::Column::State, Expr::value(state.as_str()))
            .col_expr(
                queue_messages::Column::LastError,
                Expr::value(note.map(str::to_string)),
            );
        update = match available_at {
            Some(at) => update.col_expr(
                queue_messages::Column::LockedUntil,
                Expr::value(at.fixed_offset()),
            ),
            None => update.col_expr(
                queue_messages::Column::ProcessedAt,
                Expr::value(Some(Utc::now().fixed_offset())),
            ),
        };

        let result = update
            .filter(queue_messages::Column::Id.eq(delivery.id))
            .filter(queue_messages::Column::State.eq(MessageState::Pending.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| consume_err(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(consume_err(format!(
                "message {} is not pending",
                delivery.id
            )));
        }
        Ok(())
    }
}

/// `now + duration`, saturating at the latest representable instant.
fn after(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl MessageQueue for PgQueue {
    async fn publish(&self, topic: Topic, payload: String) -> Result<i64, QueueError> {
        let now = Utc::now().fixed_offset();
        let model = queue_messages::ActiveModel {
            id: NotSet,
            topic: Set(topic.as_str().to_string()),
            payload: Set(payload),
            state: Set(MessageState::Pending.as_str().to_string()),
            attempts: Set(0),
            locked_until: Set(now),
            last_error: Set(None),
            enqueued_at: Set(now),
            processed_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(|e| QueueError::Publish {
            topic,
            message: e.to_string(),
        })?;

        debug!(%topic, message_id = model.id, "message published");
        Ok(model.id)
    }

    async fn fetch(&self, topic: Topic) -> Result<Option<Delivery>, QueueError> {
        let consume_err = |e: sea_orm::DbErr| QueueError::Consume {
            topic,
            message: e.to_string(),
        };

        let txn = self.db.begin().await.map_err(consume_err)?;

        let head = queue_messages::Entity::find()
            .filter(queue_messages::Column::Topic.eq(topic.as_str()))
            .filter(queue_messages::Column::State.eq(MessageState::Pending.as_str()))
            .order_by_asc(queue_messages::Column::Id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(consume_err)?;

        let now = Utc::now();
        let Some(head) = head.filter(|m| m.locked_until <= now) else {
            txn.commit().await.map_err(consume_err)?;
            return Ok(None);
        };

        let attempts = head.attempts.saturating_add(1);
        let delivery = Delivery {
            id: head.id,
            topic,
            payload: head.payload.clone(),
            attempt: u32::try_from(attempts).unwrap_or(u32::MAX),
        };

        let mut active = head.into_active_model();
        active.attempts = Set(attempts);
        active.locked_until = Set(after(now, self.lease).fixed_offset());
        active.update(&txn).await.map_err(consume_err)?;

        txn.commit().await.map_err(consume_err)?;
        Ok(Some(delivery))
    }

    async fn commit(&self, delivery: &Delivery, note: Option<&str>) -> Result<(), QueueError> {
        self.finish(delivery, MessageState::Committed, note, None)
            .await
    }

    async fn retry(
        &self,
        delivery: &Delivery,
        error: &str,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let at = after(Utc::now(), delay);
        self.finish(delivery, MessageState::Pending, Some(error), Some(at))
            .await
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError> {
        self.finish(delivery, MessageState::Dead, Some(reason), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_deadline_saturates() {
        let now = Utc::now();
        assert_eq!(after(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(after(now, Duration::from_secs(30)), now + TimeDelta::seconds(30));
    }
}
