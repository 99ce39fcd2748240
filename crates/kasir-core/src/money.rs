//! # Money Module
//!
//! Integer money in the currency's minor unit. Prices, subtotals and payment
//! amounts are all `i64` minor units; no floating point touches money.
//!
//! ## Where Money Is Computed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TransactionItem.subtotal   = price × quantity                          │
//! │  Transaction.totalAmount    = Σ item subtotals                          │
//! │  Transaction.changeAmount   = amountPaid − totalAmount  (COMPLETED)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is checked; overflow surfaces as
//! [`CoreError::AmountOverflow`] instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// An amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| overflow("sum"))
    }

    pub fn checked_sub(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| overflow("difference"))
    }

    /// Unit price times quantity.
    pub fn times(self, quantity: i64) -> CoreResult<Money> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| overflow("line subtotal"))
    }

    /// Sums an iterator of amounts.
    pub fn total(amounts: impl IntoIterator<Item = Money>) -> CoreResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Thousands separated with '.', the Indonesian convention.
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        if self.0 < 0 {
            write!(f, "-{grouped}")
        } else {
            write!(f, "{grouped}")
        }
    }
}

fn overflow(what: &str) -> CoreError {
    CoreError::AmountOverflow {
        what: what.to_string(),
    }
}

/// Computes the change for a completed payment.
///
/// ## Errors
/// [`CoreError::InvalidPaymentAmount`] when the customer paid less than the
/// total.
pub fn change_due(total: Money, paid: Money) -> CoreResult<Money> {
    if paid < total {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("paid {paid} is less than total {total}"),
        });
    }
    paid.checked_sub(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_subtotal() {
        let price = Money::from_minor(12_500);
        assert_eq!(price.times(3).unwrap().minor(), 37_500);
        assert!(Money::from_minor(i64::MAX).times(2).is_err());
    }

    #[test]
    fn test_total() {
        let total = Money::total([Money::from_minor(1_000), Money::from_minor(2_500)]).unwrap();
        assert_eq!(total.minor(), 3_500);
        assert_eq!(Money::total([]).unwrap(), Money::zero());
    }

    #[test]
    fn test_change_due() {
        let change = change_due(Money::from_minor(37_500), Money::from_minor(50_000)).unwrap();
        assert_eq!(change.minor(), 12_500);

        let err = change_due(Money::from_minor(37_500), Money::from_minor(20_000)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_minor(1_250_000).to_string(), "1.250.000");
        assert_eq!(Money::from_minor(999).to_string(), "999");
        assert_eq!(Money::from_minor(-15_000).to_string(), "-15.000");
    }
}
