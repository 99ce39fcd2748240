//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Argument checks (kasir-core)          SQLite error (sqlx::Error)      │
//! │  ValidationError / CoreError                  │                        │
//! │       │                                       │ constraint message     │
//! │       │                                       │ parsed here            │
//! │       ▼                                       ▼                        │
//! │  DbError (this module) ← one enum for every repository call           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller (API handler, seed binary, tests)                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried inside the layer; every failure reaches the caller.

use kasir_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and argument-validation failures so callers
/// match on one type.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `*_or_throw` reads with no matching row
    /// - `update` / `delete` on a unique selector that matches nothing
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate username or settings key
    /// - Duplicate (userId, storeId) membership
    /// - Duplicate (storeId, key) store setting
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent store, category, user or product
    /// - Deleting a row still referenced through a RESTRICT relation
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    ///
    /// ## When This Occurs
    /// - Stock decremented below zero
    /// - Negative price, zero quantity
    /// - Product and category in different stores
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Arguments rejected before any SQL was built.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A business rule refused the operation.
    ///
    /// ## When This Occurs
    /// - Completing or cancelling a transaction that is not PENDING
    /// - Underpayment on completion
    /// - Transaction total differs from the sum of its items
    #[error("{0}")]
    Domain(CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin, commit or roll back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// An interactive transaction exceeded one of its time limits.
    ///
    /// ## When This Occurs
    /// - `stage = "max_wait"`: no connection/BEGIN within `max_wait`
    /// - `stage = "timeout"`: the callback ran longer than `timeout`
    #[error("Transaction {stage} of {millis} ms exceeded")]
    TransactionTimeout { stage: String, millis: u64 },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration file or environment value is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DbError::ForeignKeyViolation { .. })
    }

    /// True for rejected input. Nothing the call wrote is kept.
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation(_))
    }
}

/// Domain errors that only wrap a validation failure surface as
/// [`DbError::Validation`], so callers see one variant per cause.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => DbError::Validation(inner),
            other => DbError::Domain(other),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
///   "UNIQUE constraint failed: users.username"    → UniqueViolation
///   "FOREIGN KEY constraint failed"               → ForeignKeyViolation
///   "CHECK constraint failed: stock >= 0"         → CheckViolation
///   "NOT NULL constraint failed: products.name"   → Validation(Required)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => classify_constraint(db_err.message()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::InvalidConfig(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::InvalidConfig(err.to_string())
    }
}

/// Maps a SQLite error message onto a DbError variant.
fn classify_constraint(msg: &str) -> DbError {
    if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
        // "user_stores.user_id, user_stores.store_id" → "user_id, store_id"
        let field = columns
            .split(", ")
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .collect::<Vec<_>>()
            .join(", ");
        DbError::UniqueViolation {
            field,
            value: "unknown".to_string(),
        }
    } else if msg.contains("FOREIGN KEY constraint failed") {
        DbError::ForeignKeyViolation {
            message: msg.to_string(),
        }
    } else if msg.contains("CHECK constraint failed") {
        DbError::CheckViolation {
            message: msg.to_string(),
        }
    } else if let Some(column) = msg.strip_prefix("NOT NULL constraint failed: ") {
        let field = column.rsplit('.').next().unwrap_or(column);
        DbError::Validation(ValidationError::Required {
            field: field.to_string(),
        })
    } else {
        DbError::QueryFailed(msg.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_unique_columns() {
        let err = classify_constraint(
            "UNIQUE constraint failed: user_stores.user_id, user_stores.store_id",
        );
        match err {
            DbError::UniqueViolation { field, .. } => assert_eq!(field, "user_id, store_id"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_check_and_not_null_classified() {
        assert!(matches!(
            classify_constraint("CHECK constraint failed: stock >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(
            classify_constraint("NOT NULL constraint failed: products.name"),
            DbError::Validation(ValidationError::Required { .. })
        ));
        assert!(classify_constraint("FOREIGN KEY constraint failed").is_foreign_key_violation());
        assert!(matches!(
            classify_constraint("no such table: nope"),
            DbError::QueryFailed(_)
        ));
    }

    #[test]
    fn test_core_validation_unwrapped() {
        let err: DbError = CoreError::Validation(ValidationError::Required {
            field: "items".to_string(),
        })
        .into();
        assert!(err.is_validation());

        let err: DbError = CoreError::TotalMismatch {
            total: 10,
            items_total: 9,
        }
        .into();
        assert!(matches!(err, DbError::Domain(_)));
    }
}
