//! `SeaORM` entities.
//!
//! Enumerated columns (`type`, `status`, `state`) are stored as text guarded
//! by CHECK constraints and parsed into the core enums by the repositories.

pub mod queue_messages;
pub mod subwallets;
pub mod transactions;
pub mod wallets;
