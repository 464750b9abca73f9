//! Service-originated credits and debits.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::validate_amount;
use tally_core::quota::quota_date;
use tally_shared::PrincipalKind;
use tally_shared::types::{AgentId, ServiceId};
use uuid::Uuid;

use super::MutationFields;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Routes for service tokens.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services/credit", post(credit))
        .route("/services/debit", post(debit))
        .route("/services/quota", get(quota))
}

/// Request body for a service credit or debit.
#[derive(Debug, Deserialize)]
pub struct AgentMutationRequest {
    /// Target agent.
    pub agent_id: Uuid,
    /// Positive amount.
    pub amount: i64,
    /// Optional metadata.
    #[serde(flatten)]
    pub fields: MutationFields,
}

async fn credit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AgentMutationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service_id = ServiceId::from_uuid(auth.require(PrincipalKind::Service)?);
    let amount = validate_amount(req.amount)?;

    let tx = state
        .ledger
        .agent_ledger()
        .credit(
            AgentId::from_uuid(req.agent_id),
            amount,
            Some(service_id),
            &req.fields.into(),
        )
        .await?;
    Ok(Json(json!({ "transaction": tx })))
}

async fn debit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AgentMutationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service_id = ServiceId::from_uuid(auth.require(PrincipalKind::Service)?);
    let amount = validate_amount(req.amount)?;

    let tx = state
        .ledger
        .agent_ledger()
        .debit(
            AgentId::from_uuid(req.agent_id),
            amount,
            Some(service_id),
            &req.fields.into(),
        )
        .await?;
    Ok(Json(json!({ "transaction": tx })))
}

async fn quota(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let service_id = ServiceId::from_uuid(auth.require(PrincipalKind::Service)?);
    let today = quota_date(Utc::now());
    let quota = state.ledger.services().quota(service_id, today).await?;
    Ok(Json(json!({
        "date": today,
        "limit": quota.limit,
        "used": quota.used,
        "remaining": quota.remaining(),
    })))
}
