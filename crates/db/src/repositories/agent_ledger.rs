//! Agent ledger repository.
//!
//! Single-currency balances on `agents.balance` with every mutation appended
//! to `transactions`. Each operation is one database transaction: the
//! idempotency pre-check, the balance change, the quota counter (for
//! service credits) and the log rows commit or roll back together.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tally_core::ledger::{
    BalanceAudit, LedgerError, LockOrder, MutationRef, TransactionKind, audit, checked_credit,
    checked_debit, validate_transfer_parties,
};
use tally_shared::types::{AgentId, Amount, PageRequest, PageResponse, ServiceId, TransactionId};
use uuid::Uuid;

use super::Unit;
use super::service::reserve_quota;
use crate::entities::{agents, transactions};
use crate::error::{db_err, is_unique_violation};

/// Agent ledger repository.
#[derive(Debug, Clone)]
pub struct AgentLedgerRepository {
    db: DatabaseConnection,
}

/// Fields of a new log row.
struct Entry<'a> {
    agent_id: Uuid,
    kind: TransactionKind,
    amount: Amount,
    balance_after: i64,
    counterparty_id: Option<Uuid>,
    service_id: Option<Uuid>,
    idempotency_key: Option<String>,
    r: &'a MutationRef,
}

impl Entry<'_> {
    fn into_active_model(self) -> transactions::ActiveModel {
        transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            agent_id: Set(self.agent_id),
            tx_type: Set(self.kind.into()),
            amount: Set(self.amount.get()),
            balance_after: Set(self.balance_after),
            counterparty_id: Set(self.counterparty_id),
            service_id: Set(self.service_id),
            reference: Set(self.r.reference.clone()),
            memo: Set(self.r.memo.clone()),
            idempotency_key: Set(self.idempotency_key),
            metadata: Set(self.r.metadata.clone()),
            created_at: Set(Utc::now().into()),
        }
    }
}

impl AgentLedgerRepository {
    /// Creates a new agent ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the agent with its current balance.
    ///
    /// # Errors
    ///
    /// Returns `AgentNotFound` if the agent does not exist.
    pub async fn balance(&self, agent_id: AgentId) -> Result<agents::Model, LedgerError> {
        agents::Entity::find_by_id(agent_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AgentNotFound(agent_id.into_inner()))
    }

    /// Credits `amount` to an agent.
    ///
    /// When `service_id` is set the credit counts against that service's
    /// daily quota in the same unit. A repeated idempotency key returns the
    /// first call's transaction without mutating anything.
    ///
    /// # Errors
    ///
    /// `AgentNotFound`, `ServiceNotFound`, `DailyLimitExceeded`,
    /// `Validation`, or a database failure.
    #[tracing::instrument(skip_all, fields(agent_id = %agent_id, amount = %amount))]
    pub async fn credit(
        &self,
        agent_id: AgentId,
        amount: Amount,
        service_id: Option<ServiceId>,
        r: &MutationRef,
    ) -> Result<transactions::Model, LedgerError> {
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed credit for idempotency key");
            return Ok(existing);
        }

        if let Some(service_id) = service_id {
            reserve_quota(&txn, service_id, amount, Utc::now()).await?;
        }

        let agent = agents::Entity::update_many()
            .col_expr(
                agents::Column::Balance,
                Expr::col(agents::Column::Balance).add(amount.get()),
            )
            .col_expr(agents::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(agents::Column::Id.eq(agent_id.into_inner()))
            .filter(agents::Column::IsActive.eq(true))
            .exec_with_returning(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .next()
            .ok_or(LedgerError::AgentNotFound(agent_id.into_inner()))?;

        let entry = Entry {
            agent_id: agent.id,
            kind: TransactionKind::Credit,
            amount,
            balance_after: agent.balance,
            counterparty_id: None,
            service_id: service_id.map(ServiceId::into_inner),
            idempotency_key: r.idempotency_key.clone(),
            r,
        };
        let unit = insert_entry(&txn, entry).await?;
        let tx = self.finish(txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, balance_after = tx.balance_after, "credit committed");
        Ok(tx)
    }

    /// Debits `amount` from an agent if its balance covers it.
    ///
    /// The floor is enforced by a single conditional update, never by a
    /// separate read. Service debits are tagged with the service but are not
    /// quota-limited.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds`, `AgentNotFound`, `Validation`, or a database failure.
    #[tracing::instrument(skip_all, fields(agent_id = %agent_id, amount = %amount))]
    pub async fn debit(
        &self,
        agent_id: AgentId,
        amount: Amount,
        service_id: Option<ServiceId>,
        r: &MutationRef,
    ) -> Result<transactions::Model, LedgerError> {
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed debit for idempotency key");
            return Ok(existing);
        }

        let updated = agents::Entity::update_many()
            .col_expr(
                agents::Column::Balance,
                Expr::col(agents::Column::Balance).sub(amount.get()),
            )
            .col_expr(agents::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(agents::Column::Id.eq(agent_id.into_inner()))
            .filter(agents::Column::IsActive.eq(true))
            .filter(agents::Column::Balance.gte(amount.get()))
            .exec_with_returning(&txn)
            .await
            .map_err(db_err)?;

        let Some(agent) = updated.into_iter().next() else {
            let current = agents::Entity::find_by_id(agent_id.into_inner())
                .filter(agents::Column::IsActive.eq(true))
                .one(&txn)
                .await
                .map_err(db_err)?
                .ok_or(LedgerError::AgentNotFound(agent_id.into_inner()))?;
            tracing::warn!(balance = current.balance, "debit rejected: insufficient funds");
            return Err(LedgerError::InsufficientFunds {
                balance: current.balance,
                requested: amount.get(),
            });
        };

        let entry = Entry {
            agent_id: agent.id,
            kind: TransactionKind::Debit,
            amount,
            balance_after: agent.balance,
            counterparty_id: None,
            service_id: service_id.map(ServiceId::into_inner),
            idempotency_key: r.idempotency_key.clone(),
            r,
        };
        let unit = insert_entry(&txn, entry).await?;
        let tx = self.finish(txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, balance_after = tx.balance_after, "debit committed");
        Ok(tx)
    }

    /// Transfers `amount` from `sender` to `receiver`.
    ///
    /// Both agent rows are locked in ascending id order before either is
    /// touched, then the `transfer_out`/`transfer_in` pair is appended. The
    /// idempotency key, if any, is carried by the `transfer_out` row, which
    /// is also what this returns.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds`, `AgentNotFound` (either side), `Validation`
    /// (including self-transfer), or a database failure.
    #[tracing::instrument(skip_all, fields(sender = %sender, receiver = %receiver, amount = %amount))]
    pub async fn transfer(
        &self,
        sender: AgentId,
        receiver: AgentId,
        amount: Amount,
        r: &MutationRef,
    ) -> Result<transactions::Model, LedgerError> {
        validate_transfer_parties(&sender, &receiver)?;
        r.validate()?;
        let key = r.idempotency_key.as_deref();
        let txn = self.db.begin().await.map_err(db_err)?;

        if let Some(existing) = find_by_key(&txn, key).await? {
            txn.commit().await.map_err(db_err)?;
            tracing::warn!(tx_id = %existing.id, "replayed transfer for idempotency key");
            return Ok(existing);
        }

        let mut from = None;
        let mut to = None;
        for id in LockOrder::for_pair(sender, receiver).as_array() {
            let locked = agents::Entity::find_by_id(id.into_inner())
                .filter(agents::Column::IsActive.eq(true))
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?
                .ok_or(LedgerError::AgentNotFound(id.into_inner()))?;
            if id == sender {
                from = Some(locked);
            } else {
                to = Some(locked);
            }
        }
        let from = from.ok_or(LedgerError::AgentNotFound(sender.into_inner()))?;
        let to = to.ok_or(LedgerError::AgentNotFound(receiver.into_inner()))?;

        let sender_after = checked_debit(from.balance, amount).inspect_err(|_| {
            tracing::warn!(balance = from.balance, "transfer rejected: insufficient funds");
        })?;
        let receiver_after = checked_credit(to.balance, amount)?;

        let now = Utc::now();
        set_balance(&txn, from.id, sender_after, now).await?;
        set_balance(&txn, to.id, receiver_after, now).await?;

        let outgoing = Entry {
            agent_id: from.id,
            kind: TransactionKind::TransferOut,
            amount,
            balance_after: sender_after,
            counterparty_id: Some(to.id),
            service_id: None,
            idempotency_key: r.idempotency_key.clone(),
            r,
        };
        let unit = insert_entry(&txn, outgoing).await?;
        if matches!(unit, Unit::Applied(_)) {
            let incoming = Entry {
                agent_id: to.id,
                kind: TransactionKind::TransferIn,
                amount,
                balance_after: receiver_after,
                counterparty_id: Some(from.id),
                service_id: None,
                idempotency_key: None,
                r,
            };
            incoming
                .into_active_model()
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }
        let tx = self.finish(txn, unit, key).await?;

        tracing::info!(tx_id = %tx.id, "transfer committed");
        Ok(tx)
    }

    /// Lists an agent's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        agent_id: AgentId,
        page: PageRequest,
    ) -> Result<PageResponse<transactions::Model>, LedgerError> {
        let page = page.normalized();
        let query =
            transactions::Entity::find().filter(transactions::Column::AgentId.eq(agent_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Replays an agent's log and compares it with the stored balance.
    ///
    /// Both are read from one repeatable-read snapshot.
    ///
    /// # Errors
    ///
    /// `AgentNotFound` or a database failure.
    pub async fn audit(&self, agent_id: AgentId) -> Result<BalanceAudit, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
            .map_err(db_err)?;

        let agent = agents::Entity::find_by_id(agent_id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AgentNotFound(agent_id.into_inner()))?;
        let log = transactions::Entity::find()
            .filter(transactions::Column::AgentId.eq(agent.id))
            .all(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        let report = audit(agent.balance, log.iter().map(|t| (t.tx_type.into(), t.amount)))?;
        if !report.is_consistent() {
            tracing::error!(agent_id = %agent_id, drift = report.drift(), "agent balance drift detected");
        }
        Ok(report)
    }

    /// Commits an applied unit, or rolls back and replays a raced key.
    async fn finish(
        &self,
        txn: DatabaseTransaction,
        unit: Unit<transactions::Model>,
        key: Option<&str>,
    ) -> Result<transactions::Model, LedgerError> {
        match unit {
            Unit::Applied(tx) => {
                txn.commit().await.map_err(db_err)?;
                Ok(tx)
            }
            Unit::KeyTaken => {
                txn.rollback().await.map_err(db_err)?;
                tracing::warn!(key, "idempotency key committed concurrently, replaying");
                find_by_key(&self.db, key).await?.ok_or_else(|| {
                    LedgerError::Internal("idempotency key taken but no transaction found".to_string())
                })
            }
        }
    }
}

async fn find_by_key<C: ConnectionTrait>(
    conn: &C,
    key: Option<&str>,
) -> Result<Option<transactions::Model>, LedgerError> {
    let Some(key) = key else {
        return Ok(None);
    };
    transactions::Entity::find()
        .filter(transactions::Column::IdempotencyKey.eq(key))
        .one(conn)
        .await
        .map_err(db_err)
}

async fn insert_entry(
    txn: &DatabaseTransaction,
    entry: Entry<'_>,
) -> Result<Unit<transactions::Model>, LedgerError> {
    match entry.into_active_model().insert(txn).await {
        Ok(tx) => Ok(Unit::Applied(tx)),
        Err(e) if is_unique_violation(&e) => Ok(Unit::KeyTaken),
        Err(e) => Err(db_err(e)),
    }
}

async fn set_balance(
    txn: &DatabaseTransaction,
    id: Uuid,
    balance: i64,
    now: chrono::DateTime<Utc>,
) -> Result<(), LedgerError> {
    agents::ActiveModel {
        id: Set(id),
        balance: Set(balance),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .update(txn)
    .await
    .map_err(db_err)?;
    Ok(())
}
