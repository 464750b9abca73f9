//! Balance replay over the transaction log.
//!
//! The stored balance is a cache: at any instant it must equal the sum of
//! every committed signed transaction amount for that account.

use serde::Serialize;

use super::error::LedgerError;
use super::types::TransactionKind;

/// Result of replaying an account's log against its stored balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceAudit {
    /// Balance held in the balance store.
    pub stored: i64,
    /// Balance recomputed from the log.
    pub replayed: i64,
    /// Number of log rows replayed.
    pub entries: u64,
}

impl BalanceAudit {
    /// Returns true when the stored balance matches the log.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.stored == self.replayed
    }

    /// Difference `stored - replayed`.
    #[must_use]
    pub const fn drift(&self) -> i64 {
        self.stored.saturating_sub(self.replayed)
    }
}

/// Sums signed amounts of a transaction log.
pub fn replay<I>(log: I) -> Result<(i64, u64), LedgerError>
where
    I: IntoIterator<Item = (TransactionKind, i64)>,
{
    let mut balance: i64 = 0;
    let mut entries: u64 = 0;
    for (kind, amount) in log {
        balance = balance
            .checked_add(kind.signed(amount))
            .ok_or_else(|| LedgerError::Internal("balance replay overflowed".to_string()))?;
        entries += 1;
    }
    Ok((balance, entries))
}

/// Replays `log` and compares it to `stored`.
pub fn audit<I>(stored: i64, log: I) -> Result<BalanceAudit, LedgerError>
where
    I: IntoIterator<Item = (TransactionKind, i64)>,
{
    let (replayed, entries) = replay(log)?;
    Ok(BalanceAudit {
        stored,
        replayed,
        entries,
    })
}
