//! Agent registration and agent wallet routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::{validate_amount, validate_transfer_parties};
use tally_shared::types::AgentId;
use tally_shared::{AppError, PrincipalKind};
use uuid::Uuid;

use super::{MutationFields, PageQuery};
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Routes open to anyone.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/agents", post(register_agent))
        .route("/leaderboard", get(leaderboard))
}

/// Routes for agent tokens.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/history", get(get_history))
        .route("/wallet/transfer", post(transfer))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for registering an agent.
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    /// Unique agent name.
    pub name: String,
}

/// Request body for an agent-to-agent transfer.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Receiving agent.
    pub receiver_id: Uuid,
    /// Positive amount.
    pub amount: i64,
    /// Optional metadata.
    #[serde(flatten)]
    pub fields: MutationFields,
}

// ============================================================================
// Handlers
// ============================================================================

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.ledger.agents().leaderboard(query.into()).await?;
    Ok(Json(page))
}

async fn register_agent(
    State(state): State<AppState>,
    Json(req): Json<RegisterAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = state.ledger.agents().create(&req.name).await?;
    let token = state
        .jwt_service
        .generate_access_token(agent.id, PrincipalKind::Agent)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "agent": agent, "token": token })),
    ))
}

async fn get_wallet(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let agent_id = AgentId::from_uuid(auth.require(PrincipalKind::Agent)?);
    let agent = state.ledger.agent_ledger().balance(agent_id).await?;
    Ok(Json(json!({ "wallet": agent })))
}

async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let agent_id = AgentId::from_uuid(auth.require(PrincipalKind::Agent)?);
    let page = state
        .ledger
        .agent_ledger()
        .history(agent_id, query.into())
        .await?;
    Ok(Json(page))
}

async fn transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender = AgentId::from_uuid(auth.require(PrincipalKind::Agent)?);
    let receiver = AgentId::from_uuid(req.receiver_id);
    validate_transfer_parties(&sender, &receiver)?;
    let amount = validate_amount(req.amount)?;

    let tx = state
        .ledger
        .agent_ledger()
        .transfer(sender, receiver, amount, &req.fields.into())
        .await?;
    Ok(Json(json!({ "transaction": tx })))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use tally_shared::PrincipalKind;
    use tower::ServiceExt;

    use crate::create_router;
    use crate::test_support::{offline_state, token};

    #[tokio::test]
    async fn test_wallet_requires_token() {
        let app = create_router(offline_state());

        let response = app
            .oneshot(Request::get("/api/v1/wallet").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wallet_rejects_user_token() {
        let state = offline_state();
        let token = token(&state, PrincipalKind::User);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::get("/api/v1/wallet")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_before_ledger() {
        let state = offline_state();
        let claims_token = token(&state, PrincipalKind::Agent);
        let me = state
            .jwt_service
            .validate_token(&claims_token)
            .unwrap()
            .subject();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::post("/api/v1/wallet/transfer")
                    .header(AUTHORIZATION, format!("Bearer {claims_token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(r#"{{"receiver_id":"{me}","amount":10}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let state = offline_state();
        let token = token(&state, PrincipalKind::Agent);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::post("/api/v1/wallet/transfer")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(
                        r#"{{"receiver_id":"{}","amount":0}}"#,
                        uuid::Uuid::now_v7()
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
