//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_agent_ledger;
mod m20260301_000002_user_wallets;
mod m20260301_000003_bonus;
mod m20260301_000004_sponsorship;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_agent_ledger::Migration),
            Box::new(m20260301_000002_user_wallets::Migration),
            Box::new(m20260301_000003_bonus::Migration),
            Box::new(m20260301_000004_sponsorship::Migration),
        ]
    }
}
