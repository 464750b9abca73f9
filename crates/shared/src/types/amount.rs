//! Integer amount in the smallest currency unit.
//!
//! CRITICAL: Never use floating-point for balances. Points, gems and
//! sponsorship amounts are whole units stored as `BIGINT`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing an [`Amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount was zero.
    #[error("amount must be positive, got 0")]
    Zero,
    /// Amount was negative.
    #[error("amount must be positive, got {0}")]
    Negative(i64),
}

/// A strictly positive amount used for every ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    /// Creates a new amount, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns `AmountError` if `value <= 0`.
    pub const fn new(value: i64) -> Result<Self, AmountError> {
        if value == 0 {
            Err(AmountError::Zero)
        } else if value < 0 {
            Err(AmountError::Negative(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(600)]
    #[case(i64::MAX)]
    fn test_positive_amounts_accepted(#[case] value: i64) {
        assert_eq!(Amount::new(value).unwrap().get(), value);
    }

    #[rstest]
    #[case(0, AmountError::Zero)]
    #[case(-1, AmountError::Negative(-1))]
    #[case(i64::MIN, AmountError::Negative(i64::MIN))]
    fn test_non_positive_amounts_rejected(#[case] value: i64, #[case] expected: AmountError) {
        assert_eq!(Amount::new(value), Err(expected));
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Amount>("0").is_err());
        assert_eq!(serde_json::from_str::<Amount>("50").unwrap().get(), 50);
    }
}
