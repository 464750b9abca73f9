//! Bonus eligibility rules.
//!
//! Checks run in a fixed order: policy presence, then `max_claims`, then
//! cooldown. Counts and recency come only from the claim rows.

use chrono::{DateTime, Duration, Utc};
use tally_shared::types::UserId;
use uuid::Uuid;

use super::types::{BonusPolicy, ClaimHistory, DenialReason, Eligibility};

/// Evaluates whether `history` allows another claim of `policy` at `now`.
///
/// A missing or inactive policy is a denial, not an error.
#[must_use]
pub fn evaluate(policy: Option<&BonusPolicy>, history: &ClaimHistory, now: DateTime<Utc>) -> Eligibility {
    let Some(policy) = policy.filter(|p| p.is_active) else {
        return Eligibility::denied(DenialReason::PolicyNotFound);
    };

    if let Some(max_claims) = policy.max_claims {
        let count = i64::try_from(history.count).unwrap_or(i64::MAX);
        if count >= max_claims {
            return Eligibility::denied(DenialReason::MaxClaimsReached);
        }
    }

    if let (Some(cooldown), Some(last)) = (policy.cooldown_seconds, history.last_claimed_at) {
        // An unrepresentable next time means the cooldown never expires.
        let next = Duration::try_seconds(cooldown).and_then(|d| last.checked_add_signed(d));
        if next.is_none_or(|next| now < next) {
            return Eligibility::Denied {
                reason: DenialReason::CooldownActive,
                next_available_at: next,
            };
        }
    }

    Eligibility::Eligible
}

/// Fresh idempotency key for one claim attempt.
///
/// Each attempt gets its own key; replay protection for claims comes from
/// the eligibility rules, not from key reuse.
#[must_use]
pub fn claim_idempotency_key(policy_code: &str, user_id: UserId) -> String {
    format!("bonus_{policy_code}_{user_id}_{}", Uuid::now_v7().simple())
}

/// Reference tag written on a bonus credit.
#[must_use]
pub fn claim_reference(policy_code: &str) -> String {
    format!("bonus:{policy_code}")
}

/// Metadata bag written on a bonus credit.
#[must_use]
pub fn claim_metadata(policy_code: &str) -> serde_json::Value {
    serde_json::json!({ "bonus_policy": policy_code })
}

#[cfg(test)]
#[path = "eligibility_tests.rs"]
mod tests;
