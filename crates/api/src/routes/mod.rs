//! API route definitions.

use axum::{Router, middleware};
use serde::Deserialize;
use tally_core::ledger::MutationRef;
use tally_shared::types::PageRequest;

use crate::{AppState, middleware::auth_middleware};

pub mod agents;
pub mod health;
pub mod services;
pub mod sponsorship;
pub mod users;

/// Creates the API router; protected routes sit behind the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(agents::protected_routes())
        .merge(services::routes())
        .merge(users::protected_routes())
        .merge(sponsorship::protected_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(agents::public_routes())
        .merge(users::public_routes())
        .merge(sponsorship::public_routes())
        .merge(protected_routes)
}

/// Optional metadata accepted by every mutating endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct MutationFields {
    /// Replay protection key.
    pub idempotency_key: Option<String>,
    /// Caller-defined tag.
    pub reference: Option<String>,
    /// Free text.
    pub memo: Option<String>,
    /// Arbitrary JSON.
    pub metadata: Option<serde_json::Value>,
}

impl From<MutationFields> for MutationRef {
    fn from(f: MutationFields) -> Self {
        Self {
            idempotency_key: f.idempotency_key,
            reference: f.reference,
            memo: f.memo,
            metadata: f.metadata,
        }
    }
}

/// `?page=&per_page=` query.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        let default = Self::default();
        Self {
            page: q.page.unwrap_or(default.page),
            per_page: q.per_page.unwrap_or(default.per_page),
        }
    }
}
