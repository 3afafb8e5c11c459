//! Core business logic for Purse.
//!
//! This crate contains the wallet ledger domain with ZERO web or database
//! dependencies. Storage and the request queue are reached through traits
//! implemented by the db crate (PostgreSQL) and by [`memory`] (tests).
//!
//! # Modules
//!
//! - `wallet` - Wallets, per-currency subwallets and their balance arithmetic
//! - `ledger` - Transaction records and the status lifecycle
//! - `escrow` - The reserve/settle engine applying invoices and withdrawals
//! - `queue` - Topics, payloads and the durable queue contract
//! - `consumer` - Queue consumer loops driving the escrow engine
//! - `memory` - In-memory store and queue

pub mod consumer;
pub mod error;
pub mod escrow;
pub mod ledger;
pub mod memory;
pub mod queue;
pub mod wallet;

pub use error::StorageError;
