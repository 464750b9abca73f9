//! Mapping from `SeaORM` errors to the ledger error taxonomy.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tally_core::ledger::LedgerError;

/// PostgreSQL SQLSTATEs the caller may retry: lock wait timeout,
/// deadlock victim, serialization failure.
const TRANSIENT_SQLSTATES: [&str; 3] = ["55P03", "40P01", "40001"];

/// `numeric_value_out_of_range`: a balance update overflowed `BIGINT`.
const OUT_OF_RANGE_SQLSTATE: &str = "22003";

/// Returns the SQLSTATE of a database-reported error, if any.
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(e)) | DbErr::Exec(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

/// Returns true if `err` is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Returns true if `err` is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Converts a database error into a [`LedgerError`].
///
/// Lock and serialization failures become [`LedgerError::Transient`], pool
/// exhaustion too. A `BIGINT` overflow is the same `Validation` error that
/// [`tally_core::ledger::checked_credit`] reports. Everything else is an
/// opaque database failure.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return LedgerError::Transient(err.to_string());
    }
    match sqlstate(&err) {
        Some(code) if TRANSIENT_SQLSTATES.contains(&code.as_str()) => {
            LedgerError::Transient(format!("{code}: {err}"))
        }
        Some(code) if code == OUT_OF_RANGE_SQLSTATE => {
            LedgerError::Validation("balance would overflow".to_string())
        }
        _ => LedgerError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_timeout_is_transient() {
        let err = db_err(DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_errors_are_database() {
        let err = db_err(DbErr::Custom("boom".to_string()));
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_custom_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&DbErr::Custom("x".to_string())));
        assert!(!is_foreign_key_violation(&DbErr::Custom("x".to_string())));
    }
}
