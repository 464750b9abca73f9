//! Sponsorship repository.
//!
//! `prepare` snapshots a tier into a `pending` order. `confirm` locks the
//! order, moves it to `rewarded` and credits the reward in one database
//! transaction, so no order can be `rewarded` without its credit.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tally_core::ledger::LedgerError;
use tally_core::sponsorship::{
    OrderSnapshot, PublicSummary, TierSnapshot, confirm_transition, reward_ref, validate_expense,
    validate_tier_snapshot,
};
use tally_shared::types::{OrderId, PageRequest, PageResponse, UserId};
use uuid::Uuid;

use super::Unit;
use super::user_wallet::{apply_credit, find_by_key, resolve_currency};
use crate::entities::sea_orm_active_enums::SponsorshipStatus;
use crate::entities::{
    platform_expenses, sponsorship_orders, sponsorship_tiers, user_transactions, users,
};
use crate::error::db_err;

/// Result of `prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedOrder {
    /// New order id.
    pub order_id: Uuid,
    /// Price snapshot.
    pub amount: i64,
    /// Reward snapshot.
    pub gem_reward: i64,
}

/// Result of `confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedOrder {
    /// The order, now `rewarded`.
    pub order: sponsorship_orders::Model,
    /// The reward credit.
    pub transaction: user_transactions::Model,
}

/// Public view of a rewarded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicSponsorship {
    /// Sponsor's display name.
    pub display_name: Option<String>,
    /// Amount paid.
    pub amount: i64,
    /// Gems granted.
    pub gem_reward: i64,
    /// When the order was created.
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Input for `add_expense`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    /// Expense category.
    pub category: String,
    /// Positive amount.
    pub amount: i64,
    /// Free text.
    pub description: Option<String>,
    /// Defaults to today (UTC).
    pub expense_date: Option<NaiveDate>,
}

/// Sponsorship repository.
#[derive(Debug, Clone)]
pub struct SponsorshipRepository {
    db: DatabaseConnection,
    reward_currency: String,
}

impl SponsorshipRepository {
    /// Creates a new sponsorship repository crediting rewards in `reward_currency`.
    #[must_use]
    pub fn new(db: DatabaseConnection, reward_currency: impl Into<String>) -> Self {
        Self {
            db,
            reward_currency: reward_currency.into(),
        }
    }

    /// Lists active tiers by `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tiers(&self) -> Result<Vec<sponsorship_tiers::Model>, LedgerError> {
        sponsorship_tiers::Entity::find()
            .filter(sponsorship_tiers::Column::IsActive.eq(true))
            .order_by_asc(sponsorship_tiers::Column::SortOrder)
            .order_by_asc(sponsorship_tiers::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Creates a `pending` order from the tier's current amount and reward.
    ///
    /// # Errors
    ///
    /// `TierNotFound` for unknown or inactive tiers, `UserNotFound`, or a
    /// database failure.
    #[tracing::instrument(skip(self))]
    pub async fn prepare(&self, user_id: UserId, tier_id: i32) -> Result<PreparedOrder, LedgerError> {
        let tier = sponsorship_tiers::Entity::find_by_id(tier_id)
            .filter(sponsorship_tiers::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::TierNotFound(tier_id))?;
        let snapshot = TierSnapshot {
            amount: tier.amount,
            gem_reward: tier.gem_reward,
        };
        validate_tier_snapshot(&snapshot)?;

        let order = sponsorship_orders::ActiveModel {
            id: Set(OrderId::new().into_inner()),
            user_id: Set(user_id.into_inner()),
            amount: Set(snapshot.amount),
            gem_reward: Set(snapshot.gem_reward),
            status: Set(SponsorshipStatus::Pending),
            payment_key: Set(None),
            created_at: Set(Utc::now().into()),
            rewarded_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if crate::error::is_foreign_key_violation(&e) {
                LedgerError::UserNotFound(user_id.into_inner())
            } else {
                db_err(e)
            }
        })?;

        tracing::info!(order_id = %order.id, gem_reward = order.gem_reward, "sponsorship order prepared");
        Ok(PreparedOrder {
            order_id: order.id,
            amount: order.amount,
            gem_reward: order.gem_reward,
        })
    }

    /// Confirms a pending order and credits its reward exactly once.
    ///
    /// Absent, foreign and already-rewarded orders fail with
    /// `OrderNotFound`; a retried confirm never credits twice.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, `CurrencyNotFound` for a misconfigured reward
    /// currency, or a database failure.
    #[tracing::instrument(skip(self, payment_key))]
    pub async fn confirm(
        &self,
        user_id: UserId,
        order_id: OrderId,
        payment_key: Option<String>,
    ) -> Result<ConfirmedOrder, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let order = sponsorship_orders::Entity::find_by_id(order_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::OrderNotFound(order_id.into_inner()))?;
        let snapshot = OrderSnapshot {
            id: order_id,
            user_id: UserId::from_uuid(order.user_id),
            status: order.status.into(),
            gem_reward: order.gem_reward,
        };
        let reward = confirm_transition(order_id, Some(&snapshot), user_id).inspect_err(|_| {
            tracing::warn!(status = %snapshot.status, "confirm rejected");
        })?;

        // Payment provider verification of `payment_key` against
        // `order.amount` belongs here once a provider is wired in.
        let mut active: sponsorship_orders::ActiveModel = order.into();
        active.status = Set(SponsorshipStatus::Rewarded);
        active.payment_key = Set(payment_key);
        active.rewarded_at = Set(Some(Utc::now().into()));
        let order = active.update(&txn).await.map_err(db_err)?;

        let r = reward_ref(order_id);
        let transaction = match find_by_key(&txn, r.idempotency_key.as_deref()).await? {
            Some(existing) => existing,
            None => {
                let currency = resolve_currency(&txn, &self.reward_currency).await?;
                match apply_credit(&txn, user_id, &currency, reward, &r).await? {
                    Unit::Applied(tx) => tx,
                    Unit::KeyTaken => {
                        return Err(LedgerError::Internal(
                            "reward credit committed outside the order lock".to_string(),
                        ));
                    }
                }
            }
        };
        txn.commit().await.map_err(db_err)?;

        tracing::info!(tx_id = %transaction.id, gem_reward = order.gem_reward, "sponsorship rewarded");
        Ok(ConfirmedOrder { order, transaction })
    }

    /// Lists a user's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn my_history(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<PageResponse<sponsorship_orders::Model>, LedgerError> {
        let page = page.normalized();
        let query = sponsorship_orders::Entity::find()
            .filter(sponsorship_orders::Column::UserId.eq(user_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(sponsorship_orders::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Totals of rewarded sponsorships and platform expenses.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn public_summary(&self) -> Result<PublicSummary, LedgerError> {
        let sponsored: Option<i64> = sponsorship_orders::Entity::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(amount), 0)::BIGINT"), "total")
            .filter(sponsorship_orders::Column::Status.eq(SponsorshipStatus::Rewarded))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let expenses: Option<i64> = platform_expenses::Entity::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(amount), 0)::BIGINT"), "total")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PublicSummary::new(
            sponsored.unwrap_or(0),
            expenses.unwrap_or(0),
        ))
    }

    /// Lists rewarded orders with the sponsor's display name, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn public_history(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<PublicSponsorship>, LedgerError> {
        let page = page.normalized();
        let query = sponsorship_orders::Entity::find()
            .filter(sponsorship_orders::Column::Status.eq(SponsorshipStatus::Rewarded));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .find_also_related(users::Entity)
            .order_by_desc(sponsorship_orders::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let data = rows
            .into_iter()
            .map(|(order, user)| PublicSponsorship {
                display_name: user.map(|u| u.display_name),
                amount: order.amount,
                gem_reward: order.gem_reward,
                created_at: order.created_at,
            })
            .collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Lists platform expenses, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn public_expenses(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<platform_expenses::Model>, LedgerError> {
        let page = page.normalized();
        let total = platform_expenses::Entity::find()
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let rows = platform_expenses::Entity::find()
            .order_by_desc(platform_expenses::Column::ExpenseDate)
            .order_by_desc(platform_expenses::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Records a platform expense.
    ///
    /// # Errors
    ///
    /// `Validation` when the category is blank or the amount is not positive.
    pub async fn add_expense(&self, input: NewExpense) -> Result<platform_expenses::Model, LedgerError> {
        let amount = validate_expense(&input.category, input.amount)?;
        let now = Utc::now();

        platform_expenses::ActiveModel {
            category: Set(input.category.trim().to_string()),
            amount: Set(amount.get()),
            description: Set(input.description),
            expense_date: Set(input.expense_date.unwrap_or_else(|| now.date_naive())),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }
}
