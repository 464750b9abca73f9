//! Sponsorship order types.

use std::fmt;

use serde::{Deserialize, Serialize};
use tally_shared::types::{OrderId, UserId};

/// Order lifecycle status. `Rewarded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created by prepare, awaiting confirmation.
    Pending,
    /// Confirmed and credited.
    Rewarded,
}

impl OrderStatus {
    /// Returns the string stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rewarded => "rewarded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of an order the state machine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSnapshot {
    /// Order id.
    pub id: OrderId,
    /// Owner.
    pub user_id: UserId,
    /// Current status.
    pub status: OrderStatus,
    /// Reward fixed at prepare time.
    pub gem_reward: i64,
}

/// Amounts copied from a tier when an order is prepared.
///
/// Later tier edits never change an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSnapshot {
    /// Price paid.
    pub amount: i64,
    /// Gems granted on confirmation.
    pub gem_reward: i64,
}

/// Public sponsorship totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSummary {
    /// Sum of rewarded order amounts.
    pub total_sponsored: i64,
    /// Sum of platform expenses.
    pub total_expenses: i64,
    /// `total_sponsored - total_expenses`; may be negative.
    pub remaining: i64,
}

impl PublicSummary {
    /// Builds the summary from the two sums.
    #[must_use]
    pub const fn new(total_sponsored: i64, total_expenses: i64) -> Self {
        Self {
            total_sponsored,
            total_expenses,
            remaining: total_sponsored.saturating_sub(total_expenses),
        }
    }
}
