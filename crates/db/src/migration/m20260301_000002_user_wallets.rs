//! User wallet migration.
//!
//! Multi-currency balances keyed by (user, currency) and their log.
//! Seeds the `point` and `gem` currencies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(CURRENCIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(USER_BALANCES_SQL).await?;
        db.execute_unprepared(USER_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(SEED_CURRENCIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const CURRENCIES_SQL: &str = r"
CREATE TABLE currencies (
    id SERIAL PRIMARY KEY,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(50) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    CONSTRAINT uq_currencies_code UNIQUE (code)
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    display_name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const USER_BALANCES_SQL: &str = r"
-- Rows are created lazily on first credit or transfer
CREATE TABLE user_balances (
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    currency_id INTEGER NOT NULL REFERENCES currencies(id),
    balance BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, currency_id),
    CONSTRAINT chk_user_balances_non_negative CHECK (balance >= 0)
);
";

const USER_TRANSACTIONS_SQL: &str = r"
CREATE TABLE user_transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id),
    currency_id INTEGER NOT NULL REFERENCES currencies(id),
    type ledger_tx_type NOT NULL,
    amount BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    counterparty_id UUID REFERENCES users(id),
    reference VARCHAR(100),
    memo TEXT,
    idempotency_key VARCHAR(255),
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_user_transactions_idempotency_key UNIQUE (idempotency_key),
    CONSTRAINT chk_user_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_user_transactions_balance_non_negative CHECK (balance_after >= 0)
);

CREATE INDEX idx_user_transactions_user ON user_transactions(user_id, created_at DESC);
CREATE INDEX idx_user_transactions_user_currency
    ON user_transactions(user_id, currency_id, created_at DESC);
";

const SEED_CURRENCIES_SQL: &str = r"
INSERT INTO currencies (code, name) VALUES
    ('point', 'Point'),
    ('gem', 'Gem')
ON CONFLICT (code) DO NOTHING;
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS user_transactions CASCADE;
DROP TABLE IF EXISTS user_balances CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS currencies CASCADE;
";
