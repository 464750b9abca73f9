//! Ledger error types.
//!
//! Every failure a ledger mutation can produce is a local, typed value
//! returned to the immediate caller. The engine never retries on its own;
//! [`LedgerError::is_retryable`] tells callers which failures are safe to
//! retry with the same idempotency key.

use tally_shared::AppError;
use tally_shared::types::AmountError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Malformed or missing input. Never persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Not Found Errors ==========
    /// Agent account not found.
    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    /// Service not found or inactive.
    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Currency code unknown or inactive.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// Sponsorship order absent, already rewarded, or owned by someone else.
    #[error("Pending order not found: {0}")]
    OrderNotFound(Uuid),

    /// Sponsorship tier absent or inactive.
    #[error("Sponsorship tier not found: {0}")]
    TierNotFound(i32),

    // ========== Business Rule Errors ==========
    /// Guarded decrement failed.
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Balance observed when the guard failed.
        balance: i64,
        /// Amount that was requested.
        requested: i64,
    },

    /// Service daily credit cap would be exceeded.
    #[error("Daily credit limit exceeded: limit {limit}, used {used}, requested {requested}")]
    DailyLimitExceeded {
        /// Configured cap for the service.
        limit: i64,
        /// Amount already credited today.
        used: i64,
        /// Amount that was requested.
        requested: i64,
    },

    // ========== Conflict Errors ==========
    /// Unique constraint violation on concurrent creation.
    #[error("Conflict: {0}")]
    Conflict(String),

    // ========== Transient Errors ==========
    /// Lock wait timeout, deadlock victim or serialization failure.
    #[error("Transient failure, please retry: {0}")]
    Transient(String),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AgentNotFound(_) => "AGENT_NOT_FOUND",
            Self::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::TierNotFound(_) => "TIER_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::DailyLimitExceeded { .. } => "DAILY_LIMIT_EXCEEDED",
            Self::Conflict(_) => "CONFLICT",
            Self::Transient(_) => "TRANSIENT_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::AgentNotFound(_)
            | Self::ServiceNotFound(_)
            | Self::UserNotFound(_)
            | Self::CurrencyNotFound(_)
            | Self::OrderNotFound(_)
            | Self::TierNotFound(_) => 404,

            // 409 Conflict
            Self::Conflict(_) => 409,

            // 422 Unprocessable - business rules
            Self::InsufficientFunds { .. } | Self::DailyLimitExceeded { .. } => 422,

            // 503 Service Unavailable - retry later
            Self::Transient(_) => 503,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns true for any of the not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.http_status_code() == 404
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(msg) => Self::Validation(msg),
            LedgerError::AgentNotFound(_)
            | LedgerError::ServiceNotFound(_)
            | LedgerError::UserNotFound(_)
            | LedgerError::CurrencyNotFound(_)
            | LedgerError::OrderNotFound(_)
            | LedgerError::TierNotFound(_) => Self::NotFound(message),
            LedgerError::InsufficientFunds { .. } | LedgerError::DailyLimitExceeded { .. } => {
                Self::BusinessRule(message)
            }
            LedgerError::Conflict(msg) => Self::Conflict(msg),
            LedgerError::Transient(msg) => Self::Unavailable(msg),
            LedgerError::Database(msg) => Self::Database(msg),
            LedgerError::Internal(msg) => Self::Internal(msg),
        }
    }
}
