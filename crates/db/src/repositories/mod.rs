//! PostgreSQL implementations of the core storage and queue traits.
//!
//! [`PgStore`] implements `WalletStore`, `TransactionLedger` and
//! `EscrowStore`; [`PgQueue`] implements `MessageQueue`.

pub mod escrow;
pub mod queue;
pub mod transaction;
pub mod wallet;

pub use escrow::PgUnit;
pub use queue::PgQueue;

use sea_orm::DatabaseConnection;

/// Wallet, ledger and escrow storage on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
