//! Transaction ledger.
//!
//! Every invoice and withdrawal leaves one transaction record. A record is
//! created in [`TransactionStatus::Created`] and moves exactly once to a
//! terminal status; after that it never changes.

mod error;
mod store;
mod types;

pub use error::LedgerError;
pub use store::TransactionLedger;
pub use types::{NewTransaction, TransactionRecord, TransactionStatus, TransactionType};
