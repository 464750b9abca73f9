//! Agent repository for registration and lookup.

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tally_core::ledger::LedgerError;
use tally_shared::types::{AgentId, PageRequest, PageResponse};
use uuid::Uuid;

use crate::entities::agents;
use crate::error::{db_err, is_unique_violation};

/// An active agent with its leaderboard position.
#[derive(Debug, Clone, Serialize)]
pub struct RankedAgent {
    /// 1-based position across all pages.
    pub rank: u64,
    /// Agent id.
    pub id: Uuid,
    /// Agent name.
    pub name: String,
    /// Current balance.
    pub balance: i64,
    /// Registration time; breaks balance ties.
    pub created_at: DateTimeWithTimeZone,
}

/// Agent repository.
#[derive(Debug, Clone)]
pub struct AgentRepository {
    db: DatabaseConnection,
}

impl AgentRepository {
    /// Creates a new agent repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a new agent with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the name is taken, `Validation` if it is blank.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<agents::Model, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("agent name must not be blank".to_string()));
        }

        let now = chrono::Utc::now().into();
        let agent = agents::ActiveModel {
            id: Set(AgentId::new().into_inner()),
            name: Set(name.to_string()),
            balance: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match agent.insert(&self.db).await {
            Ok(agent) => {
                tracing::info!(agent_id = %agent.id, "agent registered");
                Ok(agent)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(LedgerError::Conflict(format!("agent name already taken: {name}")))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Finds an agent by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: AgentId) -> Result<Option<agents::Model>, LedgerError> {
        agents::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Ranks active agents by balance, richest first.
    ///
    /// Equal balances rank by registration time, earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn leaderboard(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<RankedAgent>, LedgerError> {
        let page = page.normalized();
        let query = agents::Entity::find().filter(agents::Column::IsActive.eq(true));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(agents::Column::Balance)
            .order_by_asc(agents::Column::CreatedAt)
            .order_by_asc(agents::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let data = (page.offset() + 1..)
            .zip(rows)
            .map(|(rank, agent)| RankedAgent {
                rank,
                id: agent.id,
                name: agent.name,
                balance: agent.balance,
                created_at: agent.created_at,
            })
            .collect();

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}
