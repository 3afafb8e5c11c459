//! In-memory implementations of the storage and queue traits.
//!
//! Used by unit tests across the workspace and by the API tests. Units of
//! work are serialized by a single writer lock and publish their working
//! copy atomically on commit.

mod queue;
mod store;

pub use queue::{MemoryQueue, StoredMessage};
pub use store::{MemoryStore, MemoryUnit};
