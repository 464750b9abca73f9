//! Agent ledger migration.
//!
//! Creates agents, services, the per-service daily credit counters and the
//! append-only agent transaction log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(AGENTS_SQL).await?;
        db.execute_unprepared(SERVICES_SQL).await?;
        db.execute_unprepared(SERVICE_DAILY_CREDITS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE ledger_tx_type AS ENUM ('credit', 'debit', 'transfer_in', 'transfer_out');
";

const AGENTS_SQL: &str = r"
CREATE TABLE agents (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    balance BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_agents_name UNIQUE (name),
    CONSTRAINT chk_agents_balance_non_negative CHECK (balance >= 0)
);
";

const SERVICES_SQL: &str = r"
CREATE TABLE services (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    daily_credit_limit BIGINT NOT NULL DEFAULT 1000000,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_services_name UNIQUE (name),
    CONSTRAINT chk_services_limit_positive CHECK (daily_credit_limit > 0)
);
";

const SERVICE_DAILY_CREDITS_SQL: &str = r"
-- One row per service per UTC day; only ever incremented
CREATE TABLE service_daily_credits (
    service_id UUID NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    reference_date DATE NOT NULL,
    total_credited BIGINT NOT NULL DEFAULT 0,
    tx_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (service_id, reference_date),
    CONSTRAINT chk_sdc_total_non_negative CHECK (total_credited >= 0)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    agent_id UUID NOT NULL REFERENCES agents(id),
    type ledger_tx_type NOT NULL,
    amount BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    counterparty_id UUID REFERENCES agents(id),
    service_id UUID REFERENCES services(id),
    reference VARCHAR(100),
    memo TEXT,
    idempotency_key VARCHAR(255),
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transactions_idempotency_key UNIQUE (idempotency_key),
    CONSTRAINT chk_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transactions_balance_non_negative CHECK (balance_after >= 0)
);

-- History lookups (newest first)
CREATE INDEX idx_transactions_agent ON transactions(agent_id, created_at DESC);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS service_daily_credits CASCADE;
DROP TABLE IF EXISTS services CASCADE;
DROP TABLE IF EXISTS agents CASCADE;
DROP TYPE IF EXISTS ledger_tx_type;
";
