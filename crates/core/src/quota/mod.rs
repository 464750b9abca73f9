//! Per-service daily credit quota.
//!
//! A service may credit at most `daily_credit_limit` points per UTC calendar
//! day. The running total lives in a `(service_id, reference_date)` counter
//! that is created on the first credit of the day and only ever incremented.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tally_shared::types::Amount;

use crate::ledger::LedgerError;

/// UTC calendar day a credit made at `now` is counted against.
#[must_use]
pub fn quota_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Snapshot of a service's quota for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyQuota {
    /// Configured cap.
    pub limit: i64,
    /// Amount already credited today.
    pub used: i64,
}

impl DailyQuota {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(limit: i64, used: i64) -> Self {
        Self { limit, used }
    }

    /// Amount still creditable today.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        let left = self.limit.saturating_sub(self.used);
        if left < 0 { 0 } else { left }
    }

    /// Checks whether `amount` fits under the cap.
    ///
    /// Returns the new running total. `used + amount == limit` is allowed;
    /// only strictly exceeding the cap is rejected.
    pub fn check(&self, amount: Amount) -> Result<i64, LedgerError> {
        let exceeded = || LedgerError::DailyLimitExceeded {
            limit: self.limit,
            used: self.used,
            requested: amount.get(),
        };
        let total = self.used.checked_add(amount.get()).ok_or_else(exceeded)?;
        if total > self.limit {
            return Err(exceeded());
        }
        Ok(total)
    }
}
