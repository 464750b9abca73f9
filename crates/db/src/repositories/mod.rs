//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every ledger mutation runs inside exactly one database transaction.

pub mod agent;
pub mod agent_ledger;
pub mod bonus;
pub mod service;
pub mod sponsorship;
pub mod user;
pub mod user_wallet;

pub use agent::{AgentRepository, RankedAgent};
pub use agent_ledger::AgentLedgerRepository;
pub use bonus::{BonusClaimOutcome, BonusRepository};
pub use service::ServiceRepository;
pub use sponsorship::{
    ConfirmedOrder, NewExpense, PreparedOrder, PublicSponsorship, SponsorshipRepository,
};
pub use user::UserRepository;
pub use user_wallet::{CurrencyBalance, UserWalletRepository};

/// Outcome of the log insert that closes a mutation unit.
pub(crate) enum Unit<T> {
    /// The row was inserted; the unit may commit.
    Applied(T),
    /// A concurrent caller committed the same idempotency key first; the
    /// unit must roll back and replay that caller's transaction.
    KeyTaken,
}
