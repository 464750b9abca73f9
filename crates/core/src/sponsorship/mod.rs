//! Sponsorship orders: prepare (pending) then confirm (rewarded).

mod machine;
mod types;

pub use machine::{
    REWARD_REFERENCE, confirm_transition, reward_idempotency_key, reward_ref, validate_expense,
    validate_tier_snapshot,
};
pub use types::{OrderSnapshot, OrderStatus, PublicSummary, TierSnapshot};
