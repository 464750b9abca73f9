//! Bonus claim engine.
//!
//! Per (user, policy) a claim moves from never-claimed to claimed N times.
//! Eligibility is evaluated optimistically before the credit is issued:
//! two concurrent claims of a capped policy may both pass the check.

mod eligibility;
mod types;

pub use eligibility::{claim_idempotency_key, claim_metadata, claim_reference, evaluate};
pub use types::{BonusPolicy, ClaimHistory, ClaimOutcome, DenialReason, Eligibility};

/// Policy granted once per user at registration.
pub const SIGNUP_POLICY: &str = "signup";

/// Policy granted at most once per cooldown window on login.
pub const DAILY_VISIT_POLICY: &str = "daily_visit";
