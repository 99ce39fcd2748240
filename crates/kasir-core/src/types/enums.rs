//! # Enumerations
//!
//! Closed, wire-compatible string sets. Stored in SQLite as their wire string
//! and serialized to JSON the same way.
//!
//! | Enum                | Values                                 |
//! |---------------------|----------------------------------------|
//! | `Role`              | ADMIN, KASIR, OWNER, SUPER_ADMIN       |
//! | `PaymentMethod`     | CASH, QRIS, MIDTRANS                   |
//! | `TransactionStatus` | PENDING, COMPLETED, CANCELLED          |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::query::value::Value;

// =============================================================================
// Role
// =============================================================================

/// Role of a user, globally (`User.role`) or within one store (`UserStore.role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Admin,
    /// Cashier.
    Kasir,
    Owner,
    SuperAdmin,
}

impl Role {
    pub const VALUES: &'static [&'static str] = &["ADMIN", "KASIR", "OWNER", "SUPER_ADMIN"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Kasir => "KASIR",
            Role::Owner => "OWNER",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Indonesian standard QR payment.
    Qris,
    /// Midtrans payment gateway (uses `Transaction.midtransToken`).
    Midtrans,
}

impl PaymentMethod {
    pub const VALUES: &'static [&'static str] = &["CASH", "QRIS", "MIDTRANS"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::Midtrans => "MIDTRANS",
        }
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Lifecycle status of a transaction.
///
/// ```text
/// PENDING ──complete──► COMPLETED
///    │
///    └─────cancel─────► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const VALUES: &'static [&'static str] = &["PENDING", "COMPLETED", "CANCELLED"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

// =============================================================================
// Shared impls
// =============================================================================

fn parse_member<T: Copy>(
    field: &str,
    s: &str,
    values: &[&str],
    members: &[T],
) -> Result<T, ValidationError> {
    values
        .iter()
        .position(|v| *v == s)
        .map(|i| members[i])
        .ok_or_else(|| ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: values.iter().map(|v| v.to_string()).collect(),
        })
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_member(
            "role",
            s,
            Role::VALUES,
            &[Role::Admin, Role::Kasir, Role::Owner, Role::SuperAdmin],
        )
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_member(
            "paymentMethod",
            s,
            PaymentMethod::VALUES,
            &[PaymentMethod::Cash, PaymentMethod::Qris, PaymentMethod::Midtrans],
        )
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_member(
            "status",
            s,
            TransactionStatus::VALUES,
            &[
                TransactionStatus::Pending,
                TransactionStatus::Completed,
                TransactionStatus::Cancelled,
            ],
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for Value {
    fn from(v: Role) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl From<PaymentMethod> for Value {
    fn from(v: PaymentMethod) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl From<TransactionStatus> for Value {
    fn from(v: TransactionStatus) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings_round_trip() {
        for s in Role::VALUES {
            assert_eq!(s.parse::<Role>().unwrap().as_str(), *s);
        }
        for s in PaymentMethod::VALUES {
            assert_eq!(s.parse::<PaymentMethod>().unwrap().as_str(), *s);
        }
        for s in TransactionStatus::VALUES {
            assert_eq!(s.parse::<TransactionStatus>().unwrap().as_str(), *s);
        }
    }

    #[test]
    fn test_unknown_value_rejected() {
        let err = "CASHIER".parse::<Role>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_serde_matches_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"SUPER_ADMIN\""
        );
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"QRIS\"").unwrap(),
            PaymentMethod::Qris
        );
    }

    #[test]
    fn test_status_default_is_pending() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
    }
}
