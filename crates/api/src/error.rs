//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_shared::AppError;

/// Error returned by handlers, rendered as `{"error": code, "message": text}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Builds an error from its parts.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 with a caller-facing message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = status_from(err.http_status_code());
        if status.is_server_error() && !err.is_retryable() {
            tracing::error!(error = %err, "request failed");
            return Self::new(status, "internal_error", "An error occurred");
        }
        let code = match &err {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::AgentNotFound(_) => "agent_not_found",
            LedgerError::ServiceNotFound(_) => "service_not_found",
            LedgerError::UserNotFound(_) => "user_not_found",
            LedgerError::CurrencyNotFound(_) => "currency_not_found",
            LedgerError::OrderNotFound(_) => "order_not_found",
            LedgerError::TierNotFound(_) => "tier_not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::DailyLimitExceeded { .. } => "daily_limit_exceeded",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Transient(_) => "retry_later",
            LedgerError::Database(_) | LedgerError::Internal(_) => "internal_error",
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = status_from(err.status_code());
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
            return Self::new(status, "internal_error", "An error occurred");
        }
        let code = match &err {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::BusinessRule(_) => "business_rule_violation",
            AppError::Conflict(_) => "conflict",
            AppError::Unavailable(_) | AppError::Database(_) | AppError::Internal(_) => {
                "internal_error"
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}
