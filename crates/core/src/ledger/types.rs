//! Domain types shared by every ledger mutation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Longest idempotency key accepted (matches the `VARCHAR(255)` column).
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Kind of a transaction log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Balance increment.
    Credit,
    /// Guarded balance decrement.
    Debit,
    /// Receiving side of a transfer.
    TransferIn,
    /// Sending side of a transfer.
    TransferOut,
}

impl TransactionKind {
    /// Returns the string stored in the `type` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
        }
    }

    /// Returns true when this kind increases the balance.
    #[must_use]
    pub const fn is_inflow(&self) -> bool {
        matches!(self, Self::Credit | Self::TransferIn)
    }

    /// Applies the direction of this kind to a positive amount.
    #[must_use]
    pub const fn signed(&self, amount: i64) -> i64 {
        if self.is_inflow() { amount } else { -amount }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied annotations carried onto the transaction log row.
///
/// `idempotency_key` is globally unique when present: a second mutation with
/// the same key replays the first one's transaction instead of applying again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRef {
    /// Replay guard.
    pub idempotency_key: Option<String>,
    /// Short machine-readable tag (e.g. `sponsorship`, `bonus:signup`).
    pub reference: Option<String>,
    /// Human-readable note.
    pub memo: Option<String>,
    /// Opaque key-value bag.
    pub metadata: Option<serde_json::Value>,
}

impl MutationRef {
    /// Empty reference: no key, no tags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Sets the reference tag.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Sets the metadata bag.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validates the idempotency key, if one is present.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self.idempotency_key.as_deref() {
            None => Ok(()),
            Some(key) if key.trim().is_empty() => Err(LedgerError::Validation(
                "idempotency key must not be blank".to_string(),
            )),
            Some(key) if key.len() > MAX_IDEMPOTENCY_KEY_LEN => {
                Err(LedgerError::Validation(format!(
                    "idempotency key exceeds {MAX_IDEMPOTENCY_KEY_LEN} bytes"
                )))
            }
            Some(_) => Ok(()),
        }
    }
}
