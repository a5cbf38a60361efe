//! Monetary amount rules
//!
//! Balances and amounts are `Decimal` with at most two fractional digits.

use super::error::LedgerError;
use rust_decimal::Decimal;

/// Fractional digits allowed in amounts and balances
pub const MONEY_SCALE: u32 = 2;

fn within_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Validate an operation amount: strictly positive, at most two decimals
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO || !within_scale(amount) {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(amount)
}

/// Validate an opening balance: zero allowed, never negative
pub fn validate_opening_balance(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount < Decimal::ZERO || !within_scale(amount) {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(amount)
}

/// Render an amount with exactly two decimals
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
