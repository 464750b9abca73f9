//! `SeaORM` Entity for bonus_claims table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bonus_claims")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Uuid,
    pub policy_id: i32,
    pub transaction_id: Uuid,
    pub claimed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bonus_policies::Entity",
        from = "Column::PolicyId",
        to = "super::bonus_policies::Column::Id"
    )]
    BonusPolicies,
}

impl Related<super::bonus_policies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BonusPolicies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
