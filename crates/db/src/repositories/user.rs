//! User repository for database operations.

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;

use crate::entities::users;
use crate::error::db_err;

/// User repository for registration and lookup.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<users::Model>, LedgerError> {
        users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Creates a new user. Balances are created lazily per currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name is blank or the insert fails.
    pub async fn create(&self, display_name: &str) -> Result<users::Model, LedgerError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(LedgerError::Validation(
                "display name must not be blank".to_string(),
            ));
        }

        users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            display_name: Set(display_name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }
}
