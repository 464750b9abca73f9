//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and policy evaluation live here; the
//! `tally-db` crate applies them inside database transactions.
//!
//! # Modules
//!
//! - `ledger` - Transaction kinds, error taxonomy, lock ordering, balance replay
//! - `quota` - Per-service daily credit caps
//! - `bonus` - Bonus policy eligibility (cooldown, max claims)
//! - `sponsorship` - Sponsorship order state machine

pub mod bonus;
pub mod ledger;
pub mod quota;
pub mod sponsorship;
