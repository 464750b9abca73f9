//! Input validation for ledger operations.

use tally_shared::types::Amount;

use super::error::LedgerError;

/// Validates a raw amount coming from a caller.
///
/// Amounts are whole units in the smallest currency denomination and must be
/// strictly positive.
pub fn validate_amount(raw: i64) -> Result<Amount, LedgerError> {
    Ok(Amount::new(raw)?)
}

/// Rejects transfers where sender and receiver are the same account.
pub fn validate_transfer_parties<T: PartialEq>(sender: &T, receiver: &T) -> Result<(), LedgerError> {
    if sender == receiver {
        return Err(LedgerError::Validation(
            "cannot transfer to the same account".to_string(),
        ));
    }
    Ok(())
}

/// Adds `amount` to `balance`, failing instead of wrapping.
pub fn checked_credit(balance: i64, amount: Amount) -> Result<i64, LedgerError> {
    balance
        .checked_add(amount.get())
        .ok_or_else(|| LedgerError::Validation("balance would overflow".to_string()))
}

/// Subtracts `amount` from `balance`, enforcing the zero floor.
pub fn checked_debit(balance: i64, amount: Amount) -> Result<i64, LedgerError> {
    if balance < amount.get() {
        return Err(LedgerError::InsufficientFunds {
            balance,
            requested: amount.get(),
        });
    }
    Ok(balance - amount.get())
}
