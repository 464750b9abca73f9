//! Ledger engine facade.
//!
//! Holds one pooled connection and hands out the repositories that share it.

use sea_orm::DatabaseConnection;
use tally_core::ledger::{BalanceAudit, LedgerError};
use tally_shared::config::LedgerConfig;
use tally_shared::types::{AgentId, UserId};

use crate::repositories::{
    AgentLedgerRepository, AgentRepository, BonusRepository, ServiceRepository,
    SponsorshipRepository, UserRepository, UserWalletRepository,
};

/// Entry point to every ledger operation.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: DatabaseConnection,
    agents: AgentRepository,
    agent_ledger: AgentLedgerRepository,
    services: ServiceRepository,
    users: UserRepository,
    user_wallet: UserWalletRepository,
    bonus: BonusRepository,
    sponsorship: SponsorshipRepository,
}

impl Ledger {
    /// Builds the engine over an established connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            agents: AgentRepository::new(db.clone()),
            agent_ledger: AgentLedgerRepository::new(db.clone()),
            services: ServiceRepository::new(db.clone(), config.default_daily_credit_limit),
            users: UserRepository::new(db.clone()),
            user_wallet: UserWalletRepository::new(db.clone()),
            bonus: BonusRepository::new(db.clone()),
            sponsorship: SponsorshipRepository::new(
                db.clone(),
                config.sponsorship_reward_currency.clone(),
            ),
            db,
        }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Agent registry.
    #[must_use]
    pub const fn agents(&self) -> &AgentRepository {
        &self.agents
    }

    /// Agent point ledger.
    #[must_use]
    pub const fn agent_ledger(&self) -> &AgentLedgerRepository {
        &self.agent_ledger
    }

    /// Service registry and daily quotas.
    #[must_use]
    pub const fn services(&self) -> &ServiceRepository {
        &self.services
    }

    /// User registry.
    #[must_use]
    pub const fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Multi-currency user wallets.
    #[must_use]
    pub const fn user_wallet(&self) -> &UserWalletRepository {
        &self.user_wallet
    }

    /// Bonus claims.
    #[must_use]
    pub const fn bonus(&self) -> &BonusRepository {
        &self.bonus
    }

    /// Sponsorship orders and public transparency queries.
    #[must_use]
    pub const fn sponsorship(&self) -> &SponsorshipRepository {
        &self.sponsorship
    }

    /// Recomputes an agent's balance from its log.
    ///
    /// # Errors
    ///
    /// `AgentNotFound` or a database failure.
    pub async fn audit_agent(&self, agent_id: AgentId) -> Result<BalanceAudit, LedgerError> {
        self.agent_ledger.audit(agent_id).await
    }

    /// Recomputes a user's balance in one currency from its log.
    ///
    /// # Errors
    ///
    /// `CurrencyNotFound` or a database failure.
    pub async fn audit_user(
        &self,
        user_id: UserId,
        currency_code: &str,
    ) -> Result<BalanceAudit, LedgerError> {
        self.user_wallet.audit(user_id, currency_code).await
    }
}
