//! Bonus policy migration.
//!
//! Claim counts and recency are derived from `bonus_claims`; there is no
//! separate counter table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(BONUS_POLICIES_SQL).await?;
        db.execute_unprepared(BONUS_CLAIMS_SQL).await?;
        db.execute_unprepared(SEED_POLICIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS bonus_claims CASCADE; DROP TABLE IF EXISTS bonus_policies CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const BONUS_POLICIES_SQL: &str = r"
CREATE TABLE bonus_policies (
    id SERIAL PRIMARY KEY,
    code VARCHAR(50) NOT NULL,
    currency_id INTEGER NOT NULL REFERENCES currencies(id),
    amount BIGINT NOT NULL,
    cooldown_seconds BIGINT,
    max_claims BIGINT,
    description TEXT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    CONSTRAINT uq_bonus_policies_code UNIQUE (code),
    CONSTRAINT chk_bonus_policies_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_bonus_policies_cooldown CHECK (cooldown_seconds IS NULL OR cooldown_seconds > 0),
    CONSTRAINT chk_bonus_policies_max_claims CHECK (max_claims IS NULL OR max_claims > 0)
);
";

const BONUS_CLAIMS_SQL: &str = r"
CREATE TABLE bonus_claims (
    id BIGSERIAL PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    policy_id INTEGER NOT NULL REFERENCES bonus_policies(id),
    transaction_id UUID NOT NULL REFERENCES user_transactions(id),
    claimed_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_bonus_claims_user_policy ON bonus_claims(user_id, policy_id, claimed_at DESC);
";

const SEED_POLICIES_SQL: &str = r"
INSERT INTO bonus_policies (code, currency_id, amount, cooldown_seconds, max_claims, description)
SELECT 'signup', id, 1000, NULL, 1, 'Welcome bonus' FROM currencies WHERE code = 'point'
ON CONFLICT (code) DO NOTHING;

INSERT INTO bonus_policies (code, currency_id, amount, cooldown_seconds, max_claims, description)
SELECT 'daily_visit', id, 100, 86400, NULL, 'Daily visit bonus' FROM currencies WHERE code = 'point'
ON CONFLICT (code) DO NOTHING;
";
