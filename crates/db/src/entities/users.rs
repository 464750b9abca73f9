//! `SeaORM` Entity for users table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sponsorship_orders::Entity")]
    SponsorshipOrders,
}

impl Related<super::sponsorship_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SponsorshipOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
