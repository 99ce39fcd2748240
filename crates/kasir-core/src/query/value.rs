//! # Values and Field Metadata
//!
//! Every column of every entity is described by a [`Field`] enum variant.
//! Filters, ordering, updates and aggregates reference fields through that
//! trait, and carry their operands as a dynamically-typed [`Value`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductField::Price                                                    │
//! │     ├── column()   → "price"        (SQL)                               │
//! │     ├── name()     → "price"        (JSON / API)                        │
//! │     ├── kind()     → FieldKind::Int                                     │
//! │     └── nullable() → false                                              │
//! │                                                                         │
//! │  StoreField::TaxRate                                                    │
//! │     ├── column()   → "tax_rate"                                         │
//! │     ├── name()     → "taxRate"                                          │
//! │     └── kind()     → FieldKind::Float                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Value
// =============================================================================

/// A dynamically-typed scalar operand.
///
/// ## Storage Mapping (SQLite)
/// | Variant    | Column affinity | Notes                                 |
/// |------------|-----------------|---------------------------------------|
/// | `Bool`     | INTEGER         | 0 / 1                                 |
/// | `Int`      | INTEGER         | money in minor units, counts          |
/// | `Float`    | REAL            | tax rate                              |
/// | `Text`     | TEXT            | strings and enum wire values          |
/// | `DateTime` | TEXT            | fixed-width RFC 3339, microseconds, Z |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    Text(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::DateTime(_) => "datetime",
            Value::Text(_) => "string",
        }
    }

    /// Numeric view of the value (integers widen to f64).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stable string key, used for in-memory de-duplication (`distinct`).
    pub fn key(&self) -> String {
        match self {
            Value::Null => "\0null".to_string(),
            Value::Bool(b) => format!("b:{b}"),
            Value::Int(i) => format!("i:{i}"),
            Value::Float(f) => format!("f:{f}"),
            Value::DateTime(d) => format!("d:{}", format_timestamp(d)),
            Value::Text(s) => format!("s:{s}"),
        }
    }
}

/// Formats a timestamp the way it is stored: fixed width, UTC, microseconds.
///
/// Fixed width keeps lexicographic order equal to chronological order, so
/// range filters on TEXT columns behave.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Field Kind
// =============================================================================

/// The scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Bool,
    DateTime,
    /// Closed set of wire strings.
    Enum(&'static [&'static str]),
}

impl FieldKind {
    /// Numeric kinds accept `_avg`, `_sum` and arithmetic updates.
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::Float)
    }

    /// Kinds that accept `lt` / `lte` / `gt` / `gte`.
    pub fn supports_range(self) -> bool {
        matches!(
            self,
            FieldKind::Int | FieldKind::Float | FieldKind::DateTime | FieldKind::Text
        )
    }

    /// Kinds that accept `contains` / `startsWith` / `endsWith`.
    pub fn supports_string_match(self) -> bool {
        matches!(self, FieldKind::Text)
    }

    /// Human-readable name used in validation messages.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Int => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Enum(_) => "enum",
        }
    }

    /// Checks that a non-null value fits this kind.
    ///
    /// Integers are accepted where floats are expected; enum values must be a
    /// member of the closed set.
    pub fn check(self, field: &str, value: &Value) -> ValidationResult<()> {
        let ok = match (self, value) {
            (FieldKind::Text, Value::Text(_)) => true,
            (FieldKind::Int, Value::Int(_)) => true,
            (FieldKind::Float, Value::Float(v)) => v.is_finite(),
            (FieldKind::Float, Value::Int(_)) => true,
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::DateTime, Value::DateTime(_)) => true,
            (FieldKind::Enum(allowed), Value::Text(s)) => {
                if allowed.contains(&s.as_str()) {
                    true
                } else {
                    return Err(ValidationError::NotAllowed {
                        field: field.to_string(),
                        allowed: allowed.iter().map(|a| a.to_string()).collect(),
                    });
                }
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(ValidationError::TypeMismatch {
                field: field.to_string(),
                expected: self.describe().to_string(),
                actual: value.type_name().to_string(),
            })
        }
    }
}

// =============================================================================
// Field Trait
// =============================================================================

/// A column of an entity.
///
/// Implemented by the `*Field` enums in [`crate::types`].
pub trait Field: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// SQL column name (snake_case).
    fn column(self) -> &'static str;

    /// API / JSON name (camelCase).
    fn name(self) -> &'static str;

    /// Scalar type of the column.
    fn kind(self) -> FieldKind;

    /// Whether the column accepts NULL.
    fn nullable(self) -> bool {
        false
    }

    /// Every field of the entity, in declaration order.
    fn all() -> &'static [Self];

    /// Looks a field up by its API name.
    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.name() == name)
    }

    /// Checks a value against this field, including nullability.
    fn check_value(self, value: &Value) -> ValidationResult<()> {
        if value.is_null() {
            if self.nullable() {
                return Ok(());
            }
            return Err(ValidationError::Required {
                field: self.name().to_string(),
            });
        }
        self.kind().check(self.name(), value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_enum_kind_rejects_unknown_member() {
        let kind = FieldKind::Enum(&["CASH", "QRIS"]);
        assert!(kind.check("paymentMethod", &Value::from("CASH")).is_ok());

        let err = kind.check("paymentMethod", &Value::from("CARD")).unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_float_kind_accepts_integers() {
        assert!(FieldKind::Float.check("taxRate", &Value::Int(11)).is_ok());
        assert!(FieldKind::Float.check("taxRate", &Value::Float(f64::NAN)).is_err());
        assert!(FieldKind::Int.check("price", &Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(120);
        let (fa, fb) = (format_timestamp(&a), format_timestamp(&b));

        assert_eq!(fa, "2026-01-02T03:04:05.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Int(5));
    }
}
