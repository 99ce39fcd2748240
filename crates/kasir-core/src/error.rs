//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Argument / input validation failures           │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validation error is raised before any SQL is built, so a rejected
//! request never reaches the database.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing a transaction that is already COMPLETED
    /// - Cancelling a transaction that is already CANCELLED
    #[error("Transaction {transaction_id} is {current_status}, cannot {operation}")]
    InvalidTransactionStatus {
        transaction_id: String,
        current_status: String,
        operation: String,
    },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Transaction total does not match the sum of its item subtotals.
    #[error("Total amount {total} does not match item subtotals {items_total}")]
    TotalMismatch { total: i64, items_total: i64 },

    /// Money arithmetic left the i64 range.
    #[error("Amount overflow while computing {what}")]
    AmountOverflow { what: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input and query-argument validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value inside a single request.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A groupBy `orderBy` or `having` clause references a field missing from `by`.
    ///
    /// ## Example
    /// ```text
    /// groupBy { by: [storeId], orderBy: [{ totalAmount: asc }] }
    ///                                      ^^^^^^^^^^^ not in `by`
    /// ```
    #[error("Field \"{field}\" used in \"{clause}\" needs to be included in \"by\"")]
    FieldNotInBy { field: String, clause: String },

    /// A value does not match the declared type of the field it targets.
    #[error("{field} expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// An operation is not supported for the field's type.
    #[error("{operation} is not supported on {field}")]
    UnsupportedOperation { field: String, operation: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransactionStatus {
            transaction_id: "tx-1".to_string(),
            current_status: "COMPLETED".to_string(),
            operation: "complete".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transaction tx-1 is COMPLETED, cannot complete"
        );
    }

    #[test]
    fn test_field_not_in_by_message() {
        let err = ValidationError::FieldNotInBy {
            field: "totalAmount".to_string(),
            clause: "orderBy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Field \"totalAmount\" used in \"orderBy\" needs to be included in \"by\""
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
