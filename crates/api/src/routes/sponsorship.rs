//! Sponsorship routes and the public transparency endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_shared::PrincipalKind;
use tally_shared::types::{OrderId, UserId};
use uuid::Uuid;

use super::PageQuery;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Routes open to anyone.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/sponsorship/tiers", get(tiers))
        .route("/sponsorship/summary", get(summary))
        .route("/sponsorship/history", get(public_history))
        .route("/sponsorship/expenses", get(expenses))
}

/// Routes for user tokens.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/sponsorship/prepare", post(prepare))
        .route("/sponsorship/confirm", post(confirm))
        .route("/sponsorship/mine", get(mine))
}

/// Request body for preparing an order.
#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    /// Tier to buy.
    pub tier_id: i32,
}

/// Request body for confirming an order.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// Order returned by prepare.
    pub order_id: Uuid,
    /// Payment provider reference.
    pub payment_key: Option<String>,
}

async fn tiers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tiers = state.ledger.sponsorship().tiers().await?;
    Ok(Json(json!({ "tiers": tiers })))
}

async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.ledger.sponsorship().public_summary().await?;
    Ok(Json(summary))
}

async fn public_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.ledger.sponsorship().public_history(query.into()).await?;
    Ok(Json(page))
}

async fn expenses(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.ledger.sponsorship().public_expenses(query.into()).await?;
    Ok(Json(page))
}

async fn prepare(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PrepareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let prepared = state.ledger.sponsorship().prepare(user_id, req.tier_id).await?;
    Ok((StatusCode::CREATED, Json(prepared)))
}

async fn confirm(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let confirmed = state
        .ledger
        .sponsorship()
        .confirm(user_id, OrderId::from_uuid(req.order_id), req.payment_key)
        .await?;
    Ok(Json(confirmed))
}

async fn mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let page = state
        .ledger
        .sponsorship()
        .my_history(user_id, query.into())
        .await?;
    Ok(Json(page))
}
