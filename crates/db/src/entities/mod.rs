//! `SeaORM` entity definitions.

pub mod agents;
pub mod bonus_claims;
pub mod bonus_policies;
pub mod currencies;
pub mod platform_expenses;
pub mod sea_orm_active_enums;
pub mod service_daily_credits;
pub mod services;
pub mod sponsorship_orders;
pub mod sponsorship_tiers;
pub mod transactions;
pub mod user_balances;
pub mod user_transactions;
pub mod users;
