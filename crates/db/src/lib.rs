//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories that apply the core ledger rules inside database transactions
//! - The [`Ledger`] facade and the background [`BonusDispatcher`]
//! - Database migrations

pub mod dispatcher;
pub mod engine;
pub mod entities;
mod error;
pub mod migration;
pub mod repositories;

pub use dispatcher::{BonusDispatcher, BonusTrigger};
pub use engine::Ledger;
pub use repositories::{
    AgentLedgerRepository, AgentRepository, BonusClaimOutcome, BonusRepository, ConfirmedOrder,
    CurrencyBalance, NewExpense, PreparedOrder, PublicSponsorship, RankedAgent, ServiceRepository,
    SponsorshipRepository, UserRepository, UserWalletRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);

    Database::connect(options).await
}
