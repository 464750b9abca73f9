//! Points ledger primitives.
//!
//! This module implements the storage-independent parts of the ledger:
//! - Error taxonomy for every mutation
//! - Transaction kinds and caller-supplied mutation references
//! - Amount and transfer-party validation
//! - Ordered lock protocol for two-account operations
//! - Balance replay audit over the transaction log

pub mod audit;
pub mod error;
pub mod lock;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use audit::{BalanceAudit, audit, replay};
pub use error::LedgerError;
pub use lock::{LockOrder, ordered_pair};
pub use types::{MAX_IDEMPOTENCY_KEY_LEN, MutationRef, TransactionKind};
pub use validation::{checked_credit, checked_debit, validate_amount, validate_transfer_parties};
