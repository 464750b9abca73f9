//! Sponsorship migration.
//!
//! Tiers, two-state orders (`pending` -> `rewarded`) and the public
//! expense ledger used by the transparency summary.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(SPONSORSHIP_TIERS_SQL).await?;
        db.execute_unprepared(SPONSORSHIP_ORDERS_SQL).await?;
        db.execute_unprepared(PLATFORM_EXPENSES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE sponsorship_status AS ENUM ('pending', 'rewarded');
";

const SPONSORSHIP_TIERS_SQL: &str = r"
CREATE TABLE sponsorship_tiers (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    amount BIGINT NOT NULL,
    gem_reward BIGINT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    CONSTRAINT chk_tiers_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_tiers_reward_positive CHECK (gem_reward > 0)
);
";

const SPONSORSHIP_ORDERS_SQL: &str = r"
CREATE TABLE sponsorship_orders (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id),
    amount BIGINT NOT NULL,
    gem_reward BIGINT NOT NULL,
    status sponsorship_status NOT NULL DEFAULT 'pending',
    payment_key VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    rewarded_at TIMESTAMPTZ,
    CONSTRAINT chk_orders_rewarded_at CHECK ((status = 'rewarded') = (rewarded_at IS NOT NULL))
);

CREATE INDEX idx_sponsorship_orders_user ON sponsorship_orders(user_id, created_at DESC);
CREATE INDEX idx_sponsorship_orders_rewarded ON sponsorship_orders(created_at DESC)
    WHERE status = 'rewarded';
";

const PLATFORM_EXPENSES_SQL: &str = r"
CREATE TABLE platform_expenses (
    id SERIAL PRIMARY KEY,
    category VARCHAR(50) NOT NULL,
    amount BIGINT NOT NULL,
    description TEXT,
    expense_date DATE NOT NULL DEFAULT CURRENT_DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_expenses_amount_positive CHECK (amount > 0)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS platform_expenses CASCADE;
DROP TABLE IF EXISTS sponsorship_orders CASCADE;
DROP TABLE IF EXISTS sponsorship_tiers CASCADE;
DROP TYPE IF EXISTS sponsorship_status;
";
