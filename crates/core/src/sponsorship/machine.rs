//! Sponsorship order state machine.
//!
//! `pending -> rewarded` is the only transition. It happens once, and the
//! reward credit uses a key derived from the order id so it can be applied
//! at most once regardless of how confirm is retried.

use tally_shared::types::{Amount, OrderId, UserId};

use super::types::{OrderSnapshot, OrderStatus, TierSnapshot};
use crate::ledger::{LedgerError, MutationRef};

/// Reference tag on every sponsorship reward credit.
pub const REWARD_REFERENCE: &str = "sponsorship";

/// Decides whether `caller` may confirm `order` and returns the reward.
///
/// Absent, foreign and already-rewarded orders are all reported as
/// not found so callers cannot probe other users' orders.
pub fn confirm_transition(
    order_id: OrderId,
    order: Option<&OrderSnapshot>,
    caller: UserId,
) -> Result<Amount, LedgerError> {
    match order {
        Some(order) if order.user_id == caller && order.status == OrderStatus::Pending => {
            Ok(Amount::new(order.gem_reward)?)
        }
        _ => Err(LedgerError::OrderNotFound(order_id.into_inner())),
    }
}

/// Validates a tier snapshot before an order is created from it.
pub fn validate_tier_snapshot(tier: &TierSnapshot) -> Result<(), LedgerError> {
    Amount::new(tier.amount)?;
    Amount::new(tier.gem_reward)?;
    Ok(())
}

/// Idempotency key for the reward credit of `order_id`.
#[must_use]
pub fn reward_idempotency_key(order_id: OrderId) -> String {
    format!("spon_{order_id}")
}

/// Full mutation reference for the reward credit of `order_id`.
#[must_use]
pub fn reward_ref(order_id: OrderId) -> MutationRef {
    MutationRef::new()
        .with_idempotency_key(reward_idempotency_key(order_id))
        .with_reference(REWARD_REFERENCE)
        .with_memo(format!("Sponsorship #{order_id}"))
        .with_metadata(serde_json::json!({ "sponsorship_order_id": order_id }))
}

/// Validates a new platform expense.
pub fn validate_expense(category: &str, amount: i64) -> Result<Amount, LedgerError> {
    if category.trim().is_empty() {
        return Err(LedgerError::Validation(
            "category and amount required".to_string(),
        ));
    }
    Amount::new(amount).map_err(|_| LedgerError::Validation("category and amount required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pending(owner: UserId) -> OrderSnapshot {
        OrderSnapshot {
            id: OrderId::new(),
            user_id: owner,
            status: OrderStatus::Pending,
            gem_reward: 1000,
        }
    }

    #[test]
    fn test_owner_confirms_pending_order() {
        let owner = UserId::new();
        let order = pending(owner);
        assert_eq!(
            confirm_transition(order.id, Some(&order), owner).unwrap().get(),
            1000
        );
    }

    #[test]
    fn test_second_confirm_is_not_found() {
        let owner = UserId::new();
        let mut order = pending(owner);
        order.status = OrderStatus::Rewarded;
        assert_eq!(
            confirm_transition(order.id, Some(&order), owner),
            Err(LedgerError::OrderNotFound(order.id.into_inner()))
        );
    }

    #[test]
    fn test_foreign_order_is_not_found() {
        let order = pending(UserId::new());
        let err = confirm_transition(order.id, Some(&order), UserId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_order_is_not_found() {
        let id = OrderId::new();
        assert!(confirm_transition(id, None, UserId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_reward_ref_derived_from_order() {
        let id = OrderId::new();
        let r = reward_ref(id);
        assert_eq!(r.idempotency_key, Some(format!("spon_{id}")));
        assert_eq!(r.reference.as_deref(), Some("sponsorship"));
        assert_eq!(r.memo, Some(format!("Sponsorship #{id}")));
        assert_eq!(r.metadata.unwrap()["sponsorship_order_id"], id.to_string());
        assert_eq!(reward_ref(id).idempotency_key, reward_ref(id).idempotency_key);
    }

    #[rstest]
    #[case("", 100, false)]
    #[case("  ", 100, false)]
    #[case("hosting", 0, false)]
    #[case("hosting", -5, false)]
    #[case("hosting", 100, true)]
    fn test_validate_expense(#[case] category: &str, #[case] amount: i64, #[case] ok: bool) {
        assert_eq!(validate_expense(category, amount).is_ok(), ok);
    }

    #[test]
    fn test_tier_snapshot_must_be_positive() {
        assert!(validate_tier_snapshot(&TierSnapshot { amount: 5000, gem_reward: 1000 }).is_ok());
        assert!(validate_tier_snapshot(&TierSnapshot { amount: 5000, gem_reward: 0 }).is_err());
    }
}
