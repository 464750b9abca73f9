use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rstest::rstest;

use super::*;

fn policy(cooldown_seconds: Option<i64>, max_claims: Option<i64>) -> BonusPolicy {
    BonusPolicy {
        id: 1,
        code: "daily_visit".to_string(),
        currency_code: "point".to_string(),
        amount: 100,
        cooldown_seconds,
        max_claims,
        description: Some("Daily visit bonus".to_string()),
        is_active: true,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_missing_policy_denied() {
    let result = evaluate(None, &ClaimHistory::default(), t0());
    assert_eq!(result, Eligibility::denied(DenialReason::PolicyNotFound));
}

#[test]
fn test_inactive_policy_denied() {
    let mut p = policy(None, None);
    p.is_active = false;
    let result = evaluate(Some(&p), &ClaimHistory::default(), t0());
    assert_eq!(result, Eligibility::denied(DenialReason::PolicyNotFound));
}

#[rstest]
#[case(0, true)]
#[case(1, false)]
#[case(5, false)]
fn test_signup_max_one(#[case] count: u64, #[case] eligible: bool) {
    let p = policy(None, Some(1));
    let history = ClaimHistory {
        count,
        last_claimed_at: (count > 0).then(t0),
    };
    assert_eq!(evaluate(Some(&p), &history, t0()).is_eligible(), eligible);
}

#[test]
fn test_max_claims_checked_before_cooldown() {
    let p = policy(Some(60), Some(1));
    let history = ClaimHistory {
        count: 1,
        last_claimed_at: Some(t0()),
    };
    assert_eq!(
        evaluate(Some(&p), &history, t0()),
        Eligibility::denied(DenialReason::MaxClaimsReached)
    );
}

#[test]
fn test_cooldown_reports_next_available() {
    let p = policy(Some(86_400), None);
    let history = ClaimHistory {
        count: 1,
        last_claimed_at: Some(t0()),
    };
    let now = t0() + Duration::hours(3);
    assert_eq!(
        evaluate(Some(&p), &history, now),
        Eligibility::Denied {
            reason: DenialReason::CooldownActive,
            next_available_at: Some(t0() + Duration::days(1)),
        }
    );
}

#[test]
fn test_cooldown_expires_exactly_at_boundary() {
    let p = policy(Some(86_400), None);
    let history = ClaimHistory {
        count: 1,
        last_claimed_at: Some(t0()),
    };
    let boundary = t0() + Duration::seconds(86_400);
    assert!(evaluate(Some(&p), &history, boundary).is_eligible());
    assert!(!evaluate(Some(&p), &history, boundary - Duration::seconds(1)).is_eligible());
}

#[test]
fn test_unbounded_cooldown_never_expires() {
    let p = policy(Some(i64::MAX), None);
    let history = ClaimHistory {
        count: 1,
        last_claimed_at: Some(t0()),
    };
    assert_eq!(
        evaluate(Some(&p), &history, t0() + Duration::days(10_000)),
        Eligibility::denied(DenialReason::CooldownActive)
    );
}

#[test]
fn test_claim_key_is_fresh_per_attempt() {
    let user = UserId::new();
    let a = claim_idempotency_key("signup", user);
    let b = claim_idempotency_key("signup", user);
    assert_ne!(a, b);
    assert!(a.starts_with(&format!("bonus_signup_{user}_")));
    assert!(a.len() <= crate::ledger::MAX_IDEMPOTENCY_KEY_LEN);
}

#[test]
fn test_claim_reference_and_metadata() {
    assert_eq!(claim_reference("signup"), "bonus:signup");
    assert_eq!(claim_metadata("signup")["bonus_policy"], "signup");
}

#[test]
fn test_denial_reason_wire_names() {
    assert_eq!(
        serde_json::to_string(&DenialReason::CooldownActive).unwrap(),
        "\"cooldown_active\""
    );
    assert_eq!(DenialReason::MaxClaimsReached.as_str(), "max_claims_reached");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// With cooldown S, a claim at `last + d` is eligible iff `d >= S`.
    #[test]
    fn prop_cooldown_boundary(cooldown in 1i64..200_000, elapsed in 0i64..400_000) {
        let p = policy(Some(cooldown), None);
        let history = ClaimHistory { count: 1, last_claimed_at: Some(t0()) };
        let now = t0() + Duration::seconds(elapsed);
        prop_assert_eq!(evaluate(Some(&p), &history, now).is_eligible(), elapsed >= cooldown);
    }

    /// With max_claims M, the (count+1)-th claim is eligible iff `count < M`.
    #[test]
    fn prop_max_claims_cap(max in 1i64..20, count in 0u64..40) {
        let p = policy(None, Some(max));
        let history = ClaimHistory { count, last_claimed_at: None };
        let eligible = evaluate(Some(&p), &history, t0()).is_eligible();
        prop_assert_eq!(eligible, i64::try_from(count).unwrap() < max);
    }
}
