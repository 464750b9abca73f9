//! Integration tests for the agent point ledger.
//!
//! Covers the balance floor, idempotent replays, ordered transfers, the
//! per-service daily quota and replay audits against a live database.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_wrap)]

mod common;

use std::sync::Arc;

use futures::future::join_all;
use tally_core::ledger::{LedgerError, MutationRef, TransactionKind};
use tally_core::quota::quota_date;
use tally_db::entities::sea_orm_active_enums::LedgerTxType;
use tally_shared::types::{AgentId, PageRequest};
use tokio::sync::Barrier;

use common::{amount, funded_agent, keyed, new_agent, new_service, setup};

#[tokio::test]
async fn test_credit_then_debit_updates_balance_and_log() {
    let Some(ledger) = setup().await else { return };
    let agent = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();

    let credit = repo
        .credit(agent, amount(100), None, &MutationRef::new().with_memo("welcome"))
        .await
        .unwrap();
    assert_eq!(credit.tx_type, LedgerTxType::Credit);
    assert_eq!(credit.balance_after, 100);
    assert_eq!(credit.memo.as_deref(), Some("welcome"));

    let debit = repo
        .debit(agent, amount(30), None, &MutationRef::new())
        .await
        .unwrap();
    assert_eq!(debit.balance_after, 70);
    assert_eq!(repo.balance(agent).await.unwrap().balance, 70);

    let history = repo.history(agent, PageRequest::default()).await.unwrap();
    assert_eq!(history.meta.total, 2);
    assert_eq!(history.data[0].id, debit.id, "newest first");
}

#[tokio::test]
async fn test_debit_beyond_balance_is_rejected_without_side_effects() {
    let Some(ledger) = setup().await else { return };
    let agent = funded_agent(&ledger, 5).await;
    let repo = ledger.agent_ledger();

    let err = repo
        .debit(agent, amount(10), None, &MutationRef::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientFunds {
            balance: 5,
            requested: 10
        }
    );
    assert_eq!(repo.balance(agent).await.unwrap().balance, 5);

    let history = repo.history(agent, PageRequest::default()).await.unwrap();
    assert_eq!(history.meta.total, 1, "only the funding credit is logged");
}

#[tokio::test]
async fn test_unknown_agent_is_not_found() {
    let Some(ledger) = setup().await else { return };
    let ghost = AgentId::new();

    let err = ledger
        .agent_ledger()
        .credit(ghost, amount(1), None, &MutationRef::new())
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AgentNotFound(ghost.into_inner()));
}

#[tokio::test]
async fn test_repeated_idempotency_key_replays_first_result() {
    let Some(ledger) = setup().await else { return };
    let agent = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();
    let r = keyed("credit");

    let first = repo.credit(agent, amount(40), None, &r).await.unwrap();
    let second = repo.credit(agent, amount(40), None, &r).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(repo.balance(agent).await.unwrap().balance, 40);
}

#[tokio::test]
async fn test_blank_idempotency_key_is_rejected() {
    let Some(ledger) = setup().await else { return };
    let agent = new_agent(&ledger).await;

    let err = ledger
        .agent_ledger()
        .credit(agent, amount(1), None, &MutationRef::new().with_idempotency_key("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_transfer_moves_points_and_logs_both_sides() {
    let Some(ledger) = setup().await else { return };
    let sender = funded_agent(&ledger, 100).await;
    let receiver = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();

    let out = repo
        .transfer(sender, receiver, amount(50), &keyed("transfer"))
        .await
        .unwrap();
    assert_eq!(TransactionKind::from(out.tx_type), TransactionKind::TransferOut);
    assert_eq!(out.balance_after, 50);
    assert_eq!(out.counterparty_id, Some(receiver.into_inner()));

    assert_eq!(repo.balance(sender).await.unwrap().balance, 50);
    assert_eq!(repo.balance(receiver).await.unwrap().balance, 50);

    let incoming = repo.history(receiver, PageRequest::default()).await.unwrap();
    assert_eq!(incoming.meta.total, 1);
    assert_eq!(incoming.data[0].tx_type, LedgerTxType::TransferIn);
    assert_eq!(incoming.data[0].counterparty_id, Some(sender.into_inner()));
    assert_eq!(incoming.data[0].idempotency_key, None);
}

#[tokio::test]
async fn test_transfer_rejections() {
    let Some(ledger) = setup().await else { return };
    let sender = funded_agent(&ledger, 10).await;
    let receiver = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();

    let err = repo
        .transfer(sender, sender, amount(1), &MutationRef::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = repo
        .transfer(sender, receiver, amount(11), &MutationRef::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { balance: 10, .. }));

    let ghost = AgentId::new();
    let err = repo
        .transfer(sender, ghost, amount(1), &MutationRef::new())
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AgentNotFound(ghost.into_inner()));

    assert_eq!(repo.balance(sender).await.unwrap().balance, 10);
    assert_eq!(repo.balance(receiver).await.unwrap().balance, 0);
}

#[tokio::test]
async fn test_service_credit_is_capped_per_day() {
    let Some(ledger) = setup().await else { return };
    let service = new_service(&ledger, 1000).await;
    let agent = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();

    repo.credit(agent, amount(600), Some(service), &MutationRef::new())
        .await
        .unwrap();

    let err = repo
        .credit(agent, amount(500), Some(service), &MutationRef::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::DailyLimitExceeded {
            limit: 1000,
            used: 600,
            requested: 500
        }
    );
    assert_eq!(repo.balance(agent).await.unwrap().balance, 600);

    // Reaching the limit exactly is allowed.
    repo.credit(agent, amount(400), Some(service), &MutationRef::new())
        .await
        .unwrap();

    let quota = ledger
        .services()
        .quota(service, quota_date(chrono::Utc::now()))
        .await
        .unwrap();
    assert_eq!(quota.used, 1000);
    assert_eq!(quota.remaining(), 0);
}

#[tokio::test]
async fn test_service_debit_is_not_quota_limited() {
    let Some(ledger) = setup().await else { return };
    let service = new_service(&ledger, 10).await;
    let agent = funded_agent(&ledger, 500).await;

    let tx = ledger
        .agent_ledger()
        .debit(agent, amount(200), Some(service), &MutationRef::new())
        .await
        .unwrap();
    assert_eq!(tx.service_id, Some(service.into_inner()));
    assert_eq!(tx.balance_after, 300);
}

#[tokio::test]
async fn test_concurrent_quota_credits_never_exceed_limit() {
    let Some(ledger) = setup().await else { return };
    let service = new_service(&ledger, 1000).await;
    let mut agents = Vec::new();
    for _ in 0..10 {
        agents.push(new_agent(&ledger).await);
    }

    let barrier = Arc::new(Barrier::new(agents.len()));
    let tasks = agents.iter().map(|&agent| {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger
                .agent_ledger()
                .credit(agent, amount(200), Some(service), &MutationRef::new())
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, 5, "1000 / 200 credits fit in the quota");
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::DailyLimitExceeded { .. }))
    );
}

#[tokio::test]
async fn test_concurrent_same_key_credits_once() {
    let Some(ledger) = setup().await else { return };
    let agent = new_agent(&ledger).await;
    let r = keyed("race");

    let barrier = Arc::new(Barrier::new(8));
    let tasks = (0..8).map(|_| {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        let r = r.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.agent_ledger().credit(agent, amount(25), None, &r).await
        })
    });
    let ids: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic").unwrap().id)
        .collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]), "all callers see one transaction");
    assert_eq!(ledger.agent_ledger().balance(agent).await.unwrap().balance, 25);
}

#[tokio::test]
async fn test_opposing_concurrent_transfers_conserve_points() {
    let Some(ledger) = setup().await else { return };
    let a = funded_agent(&ledger, 1000).await;
    let b = funded_agent(&ledger, 1000).await;
    let rounds = 20;

    let barrier = Arc::new(Barrier::new(rounds));
    let tasks = (0..rounds).map(|i| {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        tokio::spawn(async move {
            barrier.wait().await;
            ledger
                .agent_ledger()
                .transfer(from, to, amount(10 + i as i64), &MutationRef::new())
                .await
        })
    });
    for joined in join_all(tasks).await {
        joined
            .expect("task should not panic")
            .expect("ordered locking should not deadlock");
    }

    let repo = ledger.agent_ledger();
    let total = repo.balance(a).await.unwrap().balance + repo.balance(b).await.unwrap().balance;
    assert_eq!(total, 2000, "transfers must conserve points");

    for agent in [a, b] {
        let audit = repo.audit(agent).await.unwrap();
        assert!(audit.is_consistent(), "drift on {agent}: {:?}", audit);
    }
}

#[tokio::test]
async fn test_audit_replays_log() {
    let Some(ledger) = setup().await else { return };
    let a = funded_agent(&ledger, 300).await;
    let b = new_agent(&ledger).await;
    let repo = ledger.agent_ledger();

    repo.debit(a, amount(50), None, &MutationRef::new()).await.unwrap();
    repo.transfer(a, b, amount(100), &MutationRef::new()).await.unwrap();

    let audit = ledger.audit_agent(a).await.unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.stored, 150);
    assert_eq!(audit.entries, 3);
    assert!(ledger.audit_agent(b).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_credit_overflow_is_a_validation_error() {
    let Some(ledger) = setup().await else { return };
    let agent = funded_agent(&ledger, 10).await;
    let repo = ledger.agent_ledger();

    let err = repo
        .credit(agent, amount(i64::MAX), None, &MutationRef::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)), "got {err:?}");
    assert!(!err.is_retryable());
    assert_eq!(repo.balance(agent).await.unwrap().balance, 10);
}
