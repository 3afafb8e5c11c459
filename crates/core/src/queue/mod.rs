//! Durable request queue contract.
//!
//! Invoice and withdraw requests travel from the HTTP edge to the consumers
//! through two topics. Delivery is at least once; the idempotency key carried
//! by every request turns redeliveries into replays.

mod error;
mod store;
mod types;

pub use error::QueueError;
pub use store::{MessageQueue, publish_request};
pub use types::{Delivery, MessageState, RequestPayload, Topic};
