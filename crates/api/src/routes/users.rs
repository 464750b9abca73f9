//! User registration, wallet and bonus routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_db::BonusTrigger;
use tally_shared::types::{PageRequest, UserId};
use tally_shared::{AppError, PrincipalKind};

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Routes open to anyone.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/users", post(register_user))
}

/// Routes for user tokens.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/balances", get(balances))
        .route("/me/history", get(history))
        .route("/me/bonus/{code}", post(claim_bonus))
}

/// Request body for registering a user.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Public display name.
    pub display_name: String,
}

/// Query for the user history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one currency code.
    pub currency: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.ledger.users().create(&req.display_name).await?;
    let token = state
        .jwt_service
        .generate_access_token(user.id, PrincipalKind::User)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    state
        .dispatcher
        .dispatch(BonusTrigger::Signup(UserId::from_uuid(user.id)));

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": user, "token": token })),
    ))
}

async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let user = state
        .ledger
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or(LedgerError::UserNotFound(user_id.into_inner()))?;

    state.dispatcher.dispatch(BonusTrigger::DailyVisit(user_id));

    Ok(Json(json!({ "user": user })))
}

async fn balances(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let balances = state.ledger.user_wallet().balances(user_id).await?;
    Ok(Json(json!({ "balances": balances })))
}

async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let default = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(default.page),
        per_page: query.per_page.unwrap_or(default.per_page),
    };

    let history = state
        .ledger
        .user_wallet()
        .history(user_id, query.currency.as_deref(), page)
        .await?;
    Ok(Json(history))
}

async fn claim_bonus(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from_uuid(auth.require(PrincipalKind::User)?);
    let outcome = state.ledger.bonus().claim(user_id, &code).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use rstest::rstest;
    use tally_shared::PrincipalKind;
    use tower::ServiceExt;

    use crate::create_router;
    use crate::test_support::{offline_state, token};

    #[rstest]
    #[case("GET", "/api/v1/me/balances")]
    #[case("GET", "/api/v1/me/history")]
    #[case("POST", "/api/v1/me/bonus/daily_visit")]
    #[tokio::test]
    async fn test_user_routes_reject_service_token(#[case] method: &str, #[case] uri: &str) {
        let state = offline_state();
        let token = token(&state, PrincipalKind::Service);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = create_router(offline_state());

        let response = app
            .oneshot(Request::get("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
