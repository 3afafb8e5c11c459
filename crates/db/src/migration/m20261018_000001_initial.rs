//! Initial database migration.
//!
//! Creates the wallet, ledger and request queue tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: WALLETS
        // ============================================================
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(SUBWALLETS_SQL).await?;

        // ============================================================
        // PART 2: LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 3: REQUEST QUEUE
        // ============================================================
        db.execute_unprepared(QUEUE_MESSAGES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    account_id VARCHAR(32) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SUBWALLETS_SQL: &str = r"
CREATE TABLE subwallets (
    wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE CASCADE,
    currency VARCHAR(3) NOT NULL CHECK (currency ~ '^[A-Z]{3}$'),
    amount NUMERIC(28, 8) NOT NULL DEFAULT 0,
    frozen_amount NUMERIC(28, 8) NOT NULL DEFAULT 0,
    PRIMARY KEY (wallet_id, currency),
    CONSTRAINT chk_subwallet_amount_non_negative CHECK (amount >= 0),
    CONSTRAINT chk_subwallet_frozen_non_negative CHECK (frozen_amount >= 0)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    currency VARCHAR(3) NOT NULL,
    type VARCHAR(16) NOT NULL CHECK (type IN ('Invoice', 'Withdraw')),
    amount NUMERIC(28, 8) NOT NULL CHECK (amount > 0),
    status VARCHAR(16) NOT NULL DEFAULT 'Created'
        CHECK (status IN ('Created', 'Success', 'Error')),
    request_key VARCHAR(255) NOT NULL UNIQUE,
    date_created TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_transactions_wallet ON transactions(wallet_id, date_created);
";

const QUEUE_MESSAGES_SQL: &str = r"
CREATE TABLE queue_messages (
    id BIGSERIAL PRIMARY KEY,
    topic VARCHAR(64) NOT NULL,
    payload TEXT NOT NULL,
    state VARCHAR(16) NOT NULL DEFAULT 'pending'
        CHECK (state IN ('pending', 'committed', 'dead')),
    attempts INTEGER NOT NULL DEFAULT 0,
    locked_until TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_error TEXT,
    enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ
);

-- Head-of-topic lookup only ever scans pending messages.
CREATE INDEX idx_queue_pending ON queue_messages(topic, id) WHERE state = 'pending';
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS queue_messages CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS subwallets CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;
";
