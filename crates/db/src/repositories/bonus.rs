//! Bonus claim repository.
//!
//! A claim runs in two units. The first reads the policy and the user's
//! claim history and commits; the second credits the wallet and records the
//! claim row together. Eligibility is therefore optimistic: two concurrent
//! claims of a capped policy can both pass the first unit.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::bonus::{
    BonusPolicy, ClaimHistory, ClaimOutcome, DAILY_VISIT_POLICY, DenialReason, Eligibility,
    SIGNUP_POLICY, claim_idempotency_key, claim_metadata, claim_reference, evaluate,
};
use tally_core::ledger::{LedgerError, MutationRef};
use tally_shared::types::{Amount, UserId};

use super::Unit;
use super::user_wallet::{apply_credit, resolve_currency};
use crate::entities::{bonus_claims, bonus_policies, currencies, user_transactions};
use crate::error::db_err;

/// Claim result carrying the user wallet transaction.
pub type BonusClaimOutcome = ClaimOutcome<user_transactions::Model>;

/// Bonus claim repository.
#[derive(Debug, Clone)]
pub struct BonusRepository {
    db: DatabaseConnection,
}

impl BonusRepository {
    /// Creates a new bonus repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a policy by code, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_policy(&self, code: &str) -> Result<Option<BonusPolicy>, LedgerError> {
        load_policy(&self.db, code).await
    }

    /// Attempts to claim `code` for `user_id` now.
    ///
    /// # Errors
    ///
    /// Denials are `Ok` outcomes; only credit or database failures are errors.
    pub async fn claim(&self, user_id: UserId, code: &str) -> Result<BonusClaimOutcome, LedgerError> {
        self.claim_at(user_id, code, Utc::now()).await
    }

    /// Attempts to claim `code` for `user_id` as of `now`.
    ///
    /// # Errors
    ///
    /// Denials are `Ok` outcomes; only credit or database failures are errors.
    #[tracing::instrument(skip(self))]
    pub async fn claim_at(
        &self,
        user_id: UserId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<BonusClaimOutcome, LedgerError> {
        let read = self.db.begin().await.map_err(db_err)?;
        let policy = load_policy(&read, code).await?;
        let history = match &policy {
            Some(p) => claim_history(&read, user_id, p.id).await?,
            None => ClaimHistory::default(),
        };
        read.commit().await.map_err(db_err)?;

        let policy = match (evaluate(policy.as_ref(), &history, now), policy) {
            (Eligibility::Eligible, Some(policy)) => policy,
            (Eligibility::Denied { reason, next_available_at }, _) => {
                tracing::debug!(reason = reason.as_str(), "bonus claim denied");
                return Ok(ClaimOutcome::denied(reason, next_available_at));
            }
            (Eligibility::Eligible, None) => {
                return Ok(ClaimOutcome::denied(DenialReason::PolicyNotFound, None));
            }
        };

        let amount = Amount::new(policy.amount)?;
        let mut r = MutationRef::new()
            .with_idempotency_key(claim_idempotency_key(code, user_id))
            .with_reference(claim_reference(code))
            .with_metadata(claim_metadata(code));
        r.memo.clone_from(&policy.description);

        let txn = self.db.begin().await.map_err(db_err)?;
        let currency = resolve_currency(&txn, &policy.currency_code).await?;
        let Unit::Applied(tx) = apply_credit(&txn, user_id, &currency, amount, &r).await? else {
            return Err(LedgerError::Internal(
                "fresh bonus idempotency key already used".to_string(),
            ));
        };
        bonus_claims::ActiveModel {
            user_id: Set(user_id.into_inner()),
            policy_id: Set(policy.id),
            transaction_id: Set(tx.id),
            claimed_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(tx_id = %tx.id, amount = policy.amount, "bonus granted");
        Ok(ClaimOutcome::granted(tx, policy.amount, policy.currency_code))
    }

    /// Claims the signup bonus. Failures are logged and reported as
    /// `granted=false, reason=error`, never returned.
    pub async fn grant_signup_bonus(&self, user_id: UserId) -> BonusClaimOutcome {
        self.claim_non_fatal(user_id, SIGNUP_POLICY).await
    }

    /// Claims the daily visit bonus. Failures are logged and reported as
    /// `granted=false, reason=error`, never returned.
    pub async fn check_daily_visit_bonus(&self, user_id: UserId) -> BonusClaimOutcome {
        self.claim_non_fatal(user_id, DAILY_VISIT_POLICY).await
    }

    async fn claim_non_fatal(&self, user_id: UserId, code: &str) -> BonusClaimOutcome {
        match self.claim(user_id, code).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(user_id = %user_id, policy = code, error = %err, "bonus claim failed (non-fatal)");
                ClaimOutcome::error()
            }
        }
    }
}

async fn load_policy<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<BonusPolicy>, LedgerError> {
    let found = bonus_policies::Entity::find()
        .filter(bonus_policies::Column::Code.eq(code))
        .find_also_related(currencies::Entity)
        .one(conn)
        .await
        .map_err(db_err)?;

    Ok(found.and_then(|(policy, currency)| {
        currency.map(|currency| BonusPolicy {
            id: policy.id,
            code: policy.code,
            currency_code: currency.code,
            amount: policy.amount,
            cooldown_seconds: policy.cooldown_seconds,
            max_claims: policy.max_claims,
            description: policy.description,
            is_active: policy.is_active,
        })
    }))
}

async fn claim_history<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
    policy_id: i32,
) -> Result<ClaimHistory, LedgerError> {
    let claims = bonus_claims::Entity::find()
        .filter(bonus_claims::Column::UserId.eq(user_id.into_inner()))
        .filter(bonus_claims::Column::PolicyId.eq(policy_id));

    let count = claims.clone().count(conn).await.map_err(db_err)?;
    let last = claims
        .order_by_desc(bonus_claims::Column::ClaimedAt)
        .one(conn)
        .await
        .map_err(db_err)?;

    Ok(ClaimHistory {
        count,
        last_claimed_at: last.map(|c| c.claimed_at.with_timezone(&Utc)),
    })
}
