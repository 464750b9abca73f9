//! Bonus policy and claim types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static configuration for a claimable bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPolicy {
    /// Row id.
    pub id: i32,
    /// Unique policy code (`signup`, `daily_visit`, ...).
    pub code: String,
    /// Currency granted.
    pub currency_code: String,
    /// Amount granted per claim.
    pub amount: i64,
    /// Minimum seconds between claims; `None` means no cooldown.
    pub cooldown_seconds: Option<i64>,
    /// Maximum claims per user; `None` means unlimited.
    pub max_claims: Option<i64>,
    /// Memo written on the credit.
    pub description: Option<String>,
    /// Inactive policies behave as if absent.
    pub is_active: bool,
}

/// A user's claim history for one policy, derived from `bonus_claims`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimHistory {
    /// Number of previous claims.
    pub count: u64,
    /// Most recent claim time.
    pub last_claimed_at: Option<DateTime<Utc>>,
}

/// Why a claim was not granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Policy missing or inactive.
    PolicyNotFound,
    /// `max_claims` already reached.
    MaxClaimsReached,
    /// Last claim is younger than `cooldown_seconds`.
    CooldownActive,
    /// The claim failed and the failure was swallowed.
    Error,
}

impl DenialReason {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyNotFound => "policy_not_found",
            Self::MaxClaimsReached => "max_claims_reached",
            Self::CooldownActive => "cooldown_active",
            Self::Error => "error",
        }
    }
}

/// Result of evaluating a policy against a claim history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// A credit may be issued.
    Eligible,
    /// No credit; benign result, not an error.
    Denied {
        /// Why.
        reason: DenialReason,
        /// Set for [`DenialReason::CooldownActive`].
        next_available_at: Option<DateTime<Utc>>,
    },
}

impl Eligibility {
    /// Shorthand for a denial without a retry time.
    #[must_use]
    pub const fn denied(reason: DenialReason) -> Self {
        Self::Denied {
            reason,
            next_available_at: None,
        }
    }

    /// Returns true if eligible.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Response of a claim attempt.
///
/// `T` is the transaction type produced by the wallet that was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome<T> {
    /// Whether a credit was issued.
    pub granted: bool,
    /// The credit transaction, when granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<T>,
    /// Amount granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Currency granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Why nothing was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    /// When the cooldown expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_at: Option<DateTime<Utc>>,
}

impl<T> ClaimOutcome<T> {
    /// A granted claim.
    pub fn granted(transaction: T, amount: i64, currency: impl Into<String>) -> Self {
        Self {
            granted: true,
            transaction: Some(transaction),
            amount: Some(amount),
            currency: Some(currency.into()),
            reason: None,
            next_available_at: None,
        }
    }

    /// A denied claim.
    #[must_use]
    pub const fn denied(reason: DenialReason, next_available_at: Option<DateTime<Utc>>) -> Self {
        Self {
            granted: false,
            transaction: None,
            amount: None,
            currency: None,
            reason: Some(reason),
            next_available_at,
        }
    }

    /// A claim whose failure was swallowed.
    #[must_use]
    pub const fn error() -> Self {
        Self::denied(DenialReason::Error, None)
    }
}
