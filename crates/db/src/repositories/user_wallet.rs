//! User wallet repository.
//!
//! Multi-currency balances keyed by (user, currency). Balance rows are
//! created lazily: credits and incoming transfers upsert, so a user with no
//! row for a currency simply has a zero balance.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tally_core::ledger::{
    BalanceAudit, LedgerError, LockOrder, MutationRef, TransactionKind, audit, checked_credit,
    checked_debit, validate_transfer_parties,
};
use tally_shared::types::{Amount, PageRequest, PageResponse, TransactionId, UserId};
use uuid::Uuid;

use super::Unit;
use crate::entities::{currencies, user_balances, user_transactions};
use crate::error::{db_err, is_foreign_key_violation, is_unique_violation};

/// A user's balance in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyBalance {
    /// Currency code.
    pub currency_code: String,
    /// Currency display name.
    pub currency_name: String,
    /// Balance; zero when no row exists yet.
    pub balance: i64,
}

/// User wallet repository.
#[derive(Debug, Clone)]
pub struct UserWalletRepository {
    db: DatabaseConnection,
}

impl UserWalletRepository {
    /// Creates a new user wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the user's balance in every active currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn balances(&self, user_id: UserId) -> Result<Vec<CurrencyBalance>, LedgerError> {
        let currencies = currencies::Entity::find()
            .filter(currencies::Column::IsActive.eq(true))
            .order_by_asc(currencies::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let rows = user_balances::Entity::find()
            .filter(user_balances::Column::UserId.eq(user_id.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(currencies
            .into_iter()
            .map(|c| CurrencyBalance {
                balance: rows
                    .iter()
                    .find(|b| b.currency_id == c.id)
                    .map_or(0, |b| b.balance),
                currency_code: c.code,
                currency_name: c.name,
            })
            .collect())
    }

    /// Returns the user's balance in one currency.
    ///
    /// # Errors
    ///
    /// `CurrencyNotFound` or a database failure.
    pub async fn balance(&self, user_id: UserId, currency_code: &str) -> Result<i64, LedgerError> {
        let currency = resolve_currency(&self.db, currency_code).await?;
        let row = user_balances::Entity::find_by_id((user_id.into_inner(), currency.id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map_or(0, |r| r.balance))
    }

    /// Credits `amount` of `currency_code` to a user.
    ///
    /// # Errors
    ///
    /// `CurrencyNotFound`, `UserNotFound`, `Validation`, or a database failure.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, currency = currency_code, amount = %amount))]
    pub async fn credit(
        &self,
        user_id: UserId,
        currency_code: &str,
        amount: Amount,
        r: &MutationRef,
    ) -> Result<user_transactions::Model, LedgerError> {
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed credit for idempotency key");
            return Ok(existing);
        }

        let currency = resolve_currency(&txn, currency_code).await?;
        let unit = apply_credit(&txn, user_id, &currency, amount, r).await?;
        let tx = finish(&self.db, txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, balance_after = tx.balance_after, "credit committed");
        Ok(tx)
    }

    /// Debits `amount` of `currency_code` from a user if the balance covers it.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds`, `CurrencyNotFound`, `Validation`, or a database failure.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, currency = currency_code, amount = %amount))]
    pub async fn debit(
        &self,
        user_id: UserId,
        currency_code: &str,
        amount: Amount,
        r: &MutationRef,
    ) -> Result<user_transactions::Model, LedgerError> {
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed debit for idempotency key");
            return Ok(existing);
        }

        let currency = resolve_currency(&txn, currency_code).await?;
        let updated = user_balances::Entity::update_many()
            .col_expr(
                user_balances::Column::Balance,
                Expr::col(user_balances::Column::Balance).sub(amount.get()),
            )
            .col_expr(user_balances::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user_balances::Column::UserId.eq(user_id.into_inner()))
            .filter(user_balances::Column::CurrencyId.eq(currency.id))
            .filter(user_balances::Column::Balance.gte(amount.get()))
            .exec_with_returning(&txn)
            .await
            .map_err(db_err)?;

        let Some(row) = updated.into_iter().next() else {
            let balance = user_balances::Entity::find_by_id((user_id.into_inner(), currency.id))
                .one(&txn)
                .await
                .map_err(db_err)?
                .map_or(0, |b| b.balance);
            tracing::warn!(balance, "debit rejected: insufficient funds");
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: amount.get(),
            });
        };

        let entry = new_entry(
            user_id.into_inner(),
            currency.id,
            TransactionKind::Debit,
            amount,
            row.balance,
            None,
            r.idempotency_key.clone(),
            r,
        );
        let unit = insert_entry(&txn, entry).await?;
        let tx = finish(&self.db, txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, balance_after = tx.balance_after, "debit committed");
        Ok(tx)
    }

    /// Transfers `amount` of `currency_code` between two users.
    ///
    /// Balance rows are created if absent and then locked in ascending user
    /// id order. The receiver never needs a pre-existing row.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds`, `CurrencyNotFound`, `UserNotFound`, `Validation`
    /// (including self-transfer), or a database failure.
    #[tracing::instrument(skip_all, fields(sender = %sender, receiver = %receiver, currency = currency_code, amount = %amount))]
    pub async fn transfer(
        &self,
        sender: UserId,
        receiver: UserId,
        currency_code: &str,
        amount: Amount,
        r: &MutationRef,
    ) -> Result<user_transactions::Model, LedgerError> {
        validate_transfer_parties(&sender, &receiver)?;
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed transfer for idempotency key");
            return Ok(existing);
        }

        let currency = resolve_currency(&txn, currency_code).await?;

        let mut from_balance = 0;
        let mut to_balance = 0;
        for id in LockOrder::for_pair(sender, receiver).as_array() {
            let balance = lock_balance_row(&txn, id, currency.id).await?;
            if id == sender {
                from_balance = balance;
            } else {
                to_balance = balance;
            }
        }

        let sender_after = checked_debit(from_balance, amount).inspect_err(|_| {
            tracing::warn!(balance = from_balance, "transfer rejected: insufficient funds");
        })?;
        let receiver_after = checked_credit(to_balance, amount)?;

        let now = Utc::now();
        set_balance(&txn, sender, currency.id, sender_after, now).await?;
        set_balance(&txn, receiver, currency.id, receiver_after, now).await?;

        let outgoing = new_entry(
            sender.into_inner(),
            currency.id,
            TransactionKind::TransferOut,
            amount,
            sender_after,
            Some(receiver.into_inner()),
            r.idempotency_key.clone(),
            r,
        );
        let unit = insert_entry(&txn, outgoing).await?;
        if matches!(unit, Unit::Applied(_)) {
            new_entry(
                receiver.into_inner(),
                currency.id,
                TransactionKind::TransferIn,
                amount,
                receiver_after,
                Some(sender.into_inner()),
                None,
                r,
            )
            .insert(&txn)
            .await
            .map_err(db_err)?;
        }
        let tx = finish(&self.db, txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, "transfer committed");
        Ok(tx)
    }

    /// Lists a user's transactions, newest first, optionally for one currency.
    ///
    /// The filter matches currencies by code whether or not they are still
    /// active; an unknown code yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        user_id: UserId,
        currency_code: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<user_transactions::Model>, LedgerError> {
        let page = page.normalized();
        let mut query = user_transactions::Entity::find()
            .filter(user_transactions::Column::UserId.eq(user_id.into_inner()));
        if let Some(code) = currency_code {
            let currency = currencies::Entity::find()
                .filter(currencies::Column::Code.eq(code))
                .one(&self.db)
                .await
                .map_err(db_err)?;
            let Some(currency) = currency else {
                return Ok(PageResponse::new(Vec::new(), page.page, page.per_page, 0));
            };
            query = query.filter(user_transactions::Column::CurrencyId.eq(currency.id));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(user_transactions::Column::CreatedAt)
            .order_by_desc(user_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Replays a user's log in one currency against the stored balance.
    ///
    /// # Errors
    ///
    /// `CurrencyNotFound` or a database failure.
    pub async fn audit(&self, user_id: UserId, currency_code: &str) -> Result<BalanceAudit, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
            .map_err(db_err)?;

        let currency = resolve_currency(&txn, currency_code).await?;
        let stored = user_balances::Entity::find_by_id((user_id.into_inner(), currency.id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .map_or(0, |b| b.balance);
        let log = user_transactions::Entity::find()
            .filter(user_transactions::Column::UserId.eq(user_id.into_inner()))
            .filter(user_transactions::Column::CurrencyId.eq(currency.id))
            .all(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        let report = audit(stored, log.iter().map(|t| (t.tx_type.into(), t.amount)))?;
        if !report.is_consistent() {
            tracing::error!(user_id = %user_id, currency = currency_code, drift = report.drift(), "user balance drift detected");
        }
        Ok(report)
    }
}

/// Looks up an active currency by code.
pub(crate) async fn resolve_currency<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<currencies::Model, LedgerError> {
    currencies::Entity::find()
        .filter(currencies::Column::Code.eq(code))
        .filter(currencies::Column::IsActive.eq(true))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::CurrencyNotFound(code.to_string()))
}

/// Finds the transaction previously committed under `key`.
pub(crate) async fn find_by_key<C: ConnectionTrait>(
    conn: &C,
    key: Option<&str>,
) -> Result<Option<user_transactions::Model>, LedgerError> {
    let Some(key) = key else {
        return Ok(None);
    };
    user_transactions::Entity::find()
        .filter(user_transactions::Column::IdempotencyKey.eq(key))
        .one(conn)
        .await
        .map_err(db_err)
}

/// Upserts the balance row and appends the `credit` log row inside `txn`.
///
/// The caller owns the unit and must have run the idempotency pre-check.
pub(crate) async fn apply_credit(
    txn: &DatabaseTransaction,
    user_id: UserId,
    currency: &currencies::Model,
    amount: Amount,
    r: &MutationRef,
) -> Result<Unit<user_transactions::Model>, LedgerError> {
    let now = Utc::now();
    let row = user_balances::ActiveModel {
        user_id: Set(user_id.into_inner()),
        currency_id: Set(currency.id),
        balance: Set(amount.get()),
        updated_at: Set(now.into()),
    };
    let balance = user_balances::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([user_balances::Column::UserId, user_balances::Column::CurrencyId])
                .value(
                    user_balances::Column::Balance,
                    Expr::col((user_balances::Entity, user_balances::Column::Balance)).add(amount.get()),
                )
                .value(user_balances::Column::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .exec_with_returning(txn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                LedgerError::UserNotFound(user_id.into_inner())
            } else {
                db_err(e)
            }
        })?
        .balance;

    let entry = new_entry(
        user_id.into_inner(),
        currency.id,
        TransactionKind::Credit,
        amount,
        balance,
        None,
        r.idempotency_key.clone(),
        r,
    );
    insert_entry(txn, entry).await
}

/// Commits an applied unit, or rolls back and replays a raced key.
pub(crate) async fn finish(
    db: &DatabaseConnection,
    txn: DatabaseTransaction,
    unit: Unit<user_transactions::Model>,
    key: Option<&str>,
) -> Result<user_transactions::Model, LedgerError> {
    match unit {
        Unit::Applied(tx) => {
            txn.commit().await.map_err(db_err)?;
            Ok(tx)
        }
        Unit::KeyTaken => {
            txn.rollback().await.map_err(db_err)?;
            tracing::warn!(key, "idempotency key committed concurrently, replaying");
            find_by_key(db, key).await?.ok_or_else(|| {
                LedgerError::Internal("idempotency key taken but no transaction found".to_string())
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn new_entry(
    user_id: Uuid,
    currency_id: i32,
    kind: TransactionKind,
    amount: Amount,
    balance_after: i64,
    counterparty_id: Option<Uuid>,
    idempotency_key: Option<String>,
    r: &MutationRef,
) -> user_transactions::ActiveModel {
    user_transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        user_id: Set(user_id),
        currency_id: Set(currency_id),
        tx_type: Set(kind.into()),
        amount: Set(amount.get()),
        balance_after: Set(balance_after),
        counterparty_id: Set(counterparty_id),
        reference: Set(r.reference.clone()),
        memo: Set(r.memo.clone()),
        idempotency_key: Set(idempotency_key),
        metadata: Set(r.metadata.clone()),
        created_at: Set(Utc::now().into()),
    }
}

async fn insert_entry(
    txn: &DatabaseTransaction,
    entry: user_transactions::ActiveModel,
) -> Result<Unit<user_transactions::Model>, LedgerError> {
    match entry.insert(txn).await {
        Ok(tx) => Ok(Unit::Applied(tx)),
        Err(e) if is_unique_violation(&e) => Ok(Unit::KeyTaken),
        Err(e) => Err(db_err(e)),
    }
}

/// Creates the (user, currency) row if absent, then locks it.
async fn lock_balance_row(
    txn: &DatabaseTransaction,
    user_id: UserId,
    currency_id: i32,
) -> Result<i64, LedgerError> {
    let row = user_balances::ActiveModel {
        user_id: Set(user_id.into_inner()),
        currency_id: Set(currency_id),
        balance: Set(0),
        updated_at: Set(Utc::now().into()),
    };
    user_balances::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([user_balances::Column::UserId, user_balances::Column::CurrencyId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                LedgerError::UserNotFound(user_id.into_inner())
            } else {
                db_err(e)
            }
        })?;

    let locked = user_balances::Entity::find_by_id((user_id.into_inner(), currency_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::UserNotFound(user_id.into_inner()))?;
    Ok(locked.balance)
}

async fn set_balance(
    txn: &DatabaseTransaction,
    user_id: UserId,
    currency_id: i32,
    balance: i64,
    now: chrono::DateTime<Utc>,
) -> Result<(), LedgerError> {
    user_balances::ActiveModel {
        user_id: Set(user_id.into_inner()),
        currency_id: Set(currency_id),
        balance: Set(balance),
        updated_at: Set(now.into()),
    }
    .update(txn)
    .await
    .map_err(db_err)?;
    Ok(())
}
