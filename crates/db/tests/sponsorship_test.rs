//! Integration tests for sponsorship orders and the transparency queries.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use tally_core::ledger::LedgerError;
use tally_db::NewExpense;
use tally_db::entities::sea_orm_active_enums::SponsorshipStatus;
use tally_shared::types::{OrderId, PageRequest};
use tokio::sync::Barrier;

use common::{new_tier, new_user, setup, unique};

#[tokio::test]
async fn test_confirm_rewards_once() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;
    let tier = new_tier(&ledger, 5000, 1000).await;
    let sponsorship = ledger.sponsorship();

    let prepared = sponsorship.prepare(user, tier).await.unwrap();
    assert_eq!(prepared.amount, 5000);
    assert_eq!(prepared.gem_reward, 1000);
    let order_id = OrderId::from_uuid(prepared.order_id);

    let confirmed = sponsorship
        .confirm(user, order_id, Some("pay_123".to_string()))
        .await
        .unwrap();
    assert_eq!(confirmed.order.status, SponsorshipStatus::Rewarded);
    assert!(confirmed.order.rewarded_at.is_some());
    assert_eq!(confirmed.transaction.amount, 1000);
    assert_eq!(
        confirmed.transaction.idempotency_key,
        Some(format!("spon_{}", prepared.order_id))
    );

    let err = sponsorship.confirm(user, order_id, None).await.unwrap_err();
    assert_eq!(err, LedgerError::OrderNotFound(prepared.order_id));

    assert_eq!(ledger.user_wallet().balance(user, "gem").await.unwrap(), 1000);
}

#[tokio::test]
async fn test_concurrent_confirms_credit_once() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;
    let tier = new_tier(&ledger, 1000, 250).await;
    let prepared = ledger.sponsorship().prepare(user, tier).await.unwrap();
    let order_id = OrderId::from_uuid(prepared.order_id);

    let barrier = Arc::new(Barrier::new(5));
    let tasks = (0..5).map(|_| {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.sponsorship().confirm(user, order_id, None).await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(ledger.user_wallet().balance(user, "gem").await.unwrap(), 250);
}

#[tokio::test]
async fn test_confirm_by_another_user_is_not_found() {
    let Some(ledger) = setup().await else { return };
    let owner = new_user(&ledger).await;
    let stranger = new_user(&ledger).await;
    let tier = new_tier(&ledger, 1000, 100).await;
    let prepared = ledger.sponsorship().prepare(owner, tier).await.unwrap();

    let err = ledger
        .sponsorship()
        .confirm(stranger, OrderId::from_uuid(prepared.order_id), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let mine = ledger
        .sponsorship()
        .my_history(owner, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.data[0].status, SponsorshipStatus::Pending);
}

#[tokio::test]
async fn test_prepare_unknown_tier() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;

    let err = ledger.sponsorship().prepare(user, -1).await.unwrap_err();
    assert_eq!(err, LedgerError::TierNotFound(-1));
}

#[tokio::test]
async fn test_public_summary_and_history() {
    let Some(ledger) = setup().await else { return };
    let user = new_user(&ledger).await;
    let tier = new_tier(&ledger, 7000, 700).await;
    let sponsorship = ledger.sponsorship();

    let prepared = sponsorship.prepare(user, tier).await.unwrap();
    sponsorship
        .confirm(user, OrderId::from_uuid(prepared.order_id), None)
        .await
        .unwrap();
    sponsorship
        .add_expense(NewExpense {
            category: unique("hosting"),
            amount: 1200,
            description: Some("servers".to_string()),
            expense_date: None,
        })
        .await
        .unwrap();

    let summary = sponsorship.public_summary().await.unwrap();
    assert!(summary.total_sponsored >= 7000);
    assert!(summary.total_expenses >= 1200);

    let history = sponsorship.public_history(PageRequest::default()).await.unwrap();
    assert!(history.meta.total >= 1);
    assert!(history.data.iter().all(|s| s.display_name.is_some()));

    let expenses = sponsorship.public_expenses(PageRequest::default()).await.unwrap();
    assert!(expenses.meta.total >= 1);
}

#[tokio::test]
async fn test_add_expense_validation() {
    let Some(ledger) = setup().await else { return };

    let err = ledger
        .sponsorship()
        .add_expense(NewExpense {
            category: " ".to_string(),
            amount: 10,
            description: None,
            expense_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .sponsorship()
        .add_expense(NewExpense {
            category: "hosting".to_string(),
            amount: 0,
            description: None,
            expense_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
