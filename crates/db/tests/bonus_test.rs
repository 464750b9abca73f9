//! Integration tests for bonus claims against the seeded policies.

mod common;

use chrono::{Duration, TimeZone, Utc};
use tally_core::bonus::{DAILY_VISIT_POLICY, DenialReason, SIGNUP_POLICY};
use tally_shared::types::UserId;

use common::{new_user, setup};

#[tokio::test]
async fn test_signup_bonus_is_granted_once() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;
    let bonus = ledger.bonus();

    let first = bonus.grant_signup_bonus(user).await;
    assert!(first.granted);
    assert_eq!(first.amount, Some(1000));
    assert_eq!(first.currency.as_deref(), Some("point"));
    let tx = first.transaction.expect("granted claims carry the credit");
    assert_eq!(tx.reference.as_deref(), Some("bonus:signup"));
    assert!(
        tx.idempotency_key
            .as_deref()
            .is_some_and(|k| k.starts_with("bonus_signup_"))
    );

    let second = bonus.grant_signup_bonus(user).await;
    assert!(!second.granted);
    assert_eq!(second.reason, Some(DenialReason::MaxClaimsReached));

    assert_eq!(ledger.user_wallet().balance(user, "point").await.unwrap(), 1000);
}

#[tokio::test]
async fn test_daily_visit_cooldown() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;
    let bonus = ledger.bonus();
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    let first = bonus.claim_at(user, DAILY_VISIT_POLICY, t0).await.unwrap();
    assert!(first.granted);

    let early = bonus
        .claim_at(user, DAILY_VISIT_POLICY, t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(!early.granted);
    assert_eq!(early.reason, Some(DenialReason::CooldownActive));
    assert_eq!(early.next_available_at, Some(t0 + Duration::days(1)));

    let next_day = bonus
        .claim_at(user, DAILY_VISIT_POLICY, t0 + Duration::days(1))
        .await
        .unwrap();
    assert!(next_day.granted);

    assert_eq!(ledger.user_wallet().balance(user, "point").await.unwrap(), 200);
}

#[tokio::test]
async fn test_unknown_policy_is_denied() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;

    let outcome = ledger.bonus().claim(user, "no_such_bonus").await.unwrap();
    assert!(!outcome.granted);
    assert_eq!(outcome.reason, Some(DenialReason::PolicyNotFound));
}

#[tokio::test]
async fn test_claim_failure_is_swallowed_by_trigger_helpers() {
    let Some(ledger) = setup().await else { return };

    let outcome = ledger.bonus().grant_signup_bonus(UserId::new()).await;
    assert!(!outcome.granted);
    assert_eq!(outcome.reason, Some(DenialReason::Error));
}

#[tokio::test]
async fn test_seeded_policies_exist() {
    let Some(ledger) = setup().await else { return };

    let signup = ledger.bonus().find_policy(SIGNUP_POLICY).await.unwrap().unwrap();
    assert_eq!(signup.max_claims, Some(1));
    let visit = ledger
        .bonus()
        .find_policy(DAILY_VISIT_POLICY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(visit.cooldown_seconds, Some(86_400));
}
