//! Service repository and the per-service daily credit quota.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set,
};
use tally_core::ledger::LedgerError;
use tally_core::quota::{DailyQuota, quota_date};
use tally_shared::types::{Amount, ServiceId};

use crate::entities::{service_daily_credits, services};
use crate::error::{db_err, is_unique_violation};

/// Service repository.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    db: DatabaseConnection,
    default_daily_credit_limit: i64,
}

impl ServiceRepository {
    /// Creates a new service repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, default_daily_credit_limit: i64) -> Self {
        Self {
            db,
            default_daily_credit_limit,
        }
    }

    /// Registers a new service.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the name is taken, `Validation` for a blank name
    /// or a non-positive limit.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        name: &str,
        daily_credit_limit: Option<i64>,
    ) -> Result<services::Model, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("service name must not be blank".to_string()));
        }
        let limit = daily_credit_limit.unwrap_or(self.default_daily_credit_limit);
        if limit <= 0 {
            return Err(LedgerError::Validation(
                "daily credit limit must be positive".to_string(),
            ));
        }

        let service = services::ActiveModel {
            id: Set(ServiceId::new().into_inner()),
            name: Set(name.to_string()),
            daily_credit_limit: Set(limit),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        match service.insert(&self.db).await {
            Ok(service) => {
                tracing::info!(service_id = %service.id, limit, "service registered");
                Ok(service)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(LedgerError::Conflict(format!("service name already taken: {name}")))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Finds an active service by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, id: ServiceId) -> Result<Option<services::Model>, LedgerError> {
        services::Entity::find_by_id(id.into_inner())
            .filter(services::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Returns the service's quota snapshot for `date`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceNotFound` for unknown or inactive services.
    pub async fn quota(&self, id: ServiceId, date: NaiveDate) -> Result<DailyQuota, LedgerError> {
        let service = self
            .find_active(id)
            .await?
            .ok_or(LedgerError::ServiceNotFound(id.into_inner()))?;
        let used = credited_on(&self.db, id, date).await?;
        Ok(DailyQuota::new(service.daily_credit_limit, used))
    }
}

/// Amount a service has credited on `date`.
async fn credited_on<C: ConnectionTrait>(
    conn: &C,
    id: ServiceId,
    date: NaiveDate,
) -> Result<i64, LedgerError> {
    let counter = service_daily_credits::Entity::find_by_id((id.into_inner(), date))
        .one(conn)
        .await
        .map_err(db_err)?;
    Ok(counter.map_or(0, |c| c.total_credited))
}

/// Checks and consumes `amount` of the service's quota for the UTC day of `now`.
///
/// Must run inside the same unit as the credit it guards. The service row is
/// locked first so concurrent credits from one service serialise on the
/// read-check-increment; rolling back the unit releases the reservation.
pub(crate) async fn reserve_quota(
    txn: &DatabaseTransaction,
    id: ServiceId,
    amount: Amount,
    now: DateTime<Utc>,
) -> Result<DailyQuota, LedgerError> {
    let service = services::Entity::find_by_id(id.into_inner())
        .filter(services::Column::IsActive.eq(true))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::ServiceNotFound(id.into_inner()))?;

    let date = quota_date(now);
    let quota = DailyQuota::new(service.daily_credit_limit, credited_on(txn, id, date).await?);
    let total = quota.check(amount).inspect_err(|_| {
        tracing::warn!(
            service_id = %id,
            limit = quota.limit,
            used = quota.used,
            requested = amount.get(),
            "daily credit limit exceeded"
        );
    })?;

    let counter = service_daily_credits::ActiveModel {
        service_id: Set(id.into_inner()),
        reference_date: Set(date),
        total_credited: Set(amount.get()),
        tx_count: Set(1),
    };
    service_daily_credits::Entity::insert(counter)
        .on_conflict(
            OnConflict::columns([
                service_daily_credits::Column::ServiceId,
                service_daily_credits::Column::ReferenceDate,
            ])
            .value(
                service_daily_credits::Column::TotalCredited,
                Expr::col((
                    service_daily_credits::Entity,
                    service_daily_credits::Column::TotalCredited,
                ))
                .add(amount.get()),
            )
            .value(
                service_daily_credits::Column::TxCount,
                Expr::col((
                    service_daily_credits::Entity,
                    service_daily_credits::Column::TxCount,
                ))
                .add(1),
            )
            .to_owned(),
        )
        .exec_without_returning(txn)
        .await
        .map_err(db_err)?;

    Ok(DailyQuota::new(quota.limit, total))
}
