//! Escrow engine.
//!
//! Invoices and withdrawals are applied in two phases. The amount is first
//! placed in escrow (`frozen_amount`), the transaction is recorded in status
//! `Created`, then the escrow is settled and the transaction moves to a
//! terminal status. All of it happens inside one [`EscrowUnit`].

mod engine;
mod error;
mod request;
mod store;

#[cfg(test)]
mod engine_props;

pub use engine::EscrowEngine;
pub use error::EscrowError;
pub use request::{
    EscrowOutcome, EscrowRequest, MAX_AMOUNT_SCALE, MAX_KEY_LEN, MESSAGE_KEY_PREFIX, validate_amount,
    validate_key,
};
pub use store::{EscrowStore, EscrowUnit, LockMode};
