//! # Update Operations
//!
//! Update inputs lower to a list of [`Assignment`]s, one per touched column.
//!
//! ```text
//! UpdateProduct { stock: Some(NumberUpdate::Decrement(2)), image: Some(None), .. }
//!      │
//!      ▼
//! [ Assignment { stock, Decrement, 2 }, Assignment { image, Set, NULL } ]
//!      │
//!      ▼
//! UPDATE products SET stock = stock - ?, image = ?, updated_at = ? WHERE …
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::query::value::{Field, Value};
use crate::validation::ValidationResult;

/// How an assignment combines the operand with the current column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateOp {
    Set,
    Increment,
    Decrement,
    Multiply,
    Divide,
}

impl UpdateOp {
    pub fn is_arithmetic(self) -> bool {
        !matches!(self, UpdateOp::Set)
    }
}

/// A single `SET` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment<F> {
    pub field: F,
    pub op: UpdateOp,
    pub value: Value,
}

impl<F: Field> Assignment<F> {
    pub fn set(field: F, value: impl Into<Value>) -> Self {
        Assignment {
            field,
            op: UpdateOp::Set,
            value: value.into(),
        }
    }
}

/// Numeric update operation for an integer or float field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberUpdate<T> {
    Set(T),
    Increment(T),
    Decrement(T),
    Multiply(T),
    Divide(T),
}

impl<T: Into<Value> + Copy> NumberUpdate<T> {
    /// Lowers the operation to an assignment on `field`.
    pub fn to_assignment<F: Field>(self, field: F) -> Assignment<F> {
        let (op, value) = match self {
            NumberUpdate::Set(v) => (UpdateOp::Set, v),
            NumberUpdate::Increment(v) => (UpdateOp::Increment, v),
            NumberUpdate::Decrement(v) => (UpdateOp::Decrement, v),
            NumberUpdate::Multiply(v) => (UpdateOp::Multiply, v),
            NumberUpdate::Divide(v) => (UpdateOp::Divide, v),
        };
        Assignment {
            field,
            op,
            value: value.into(),
        }
    }

    /// The value written when this is a plain `Set`.
    pub fn set_value(&self) -> Option<T> {
        match self {
            NumberUpdate::Set(v) => Some(*v),
            _ => None,
        }
    }
}

/// Validates a list of assignments against field types.
///
/// ## Rules
/// - A field may be assigned at most once
/// - NULL only on nullable fields
/// - Arithmetic only on numeric fields, never dividing by zero
pub fn validate_assignments<F: Field>(assignments: &[Assignment<F>]) -> ValidationResult<()> {
    let mut seen = HashSet::new();

    for a in assignments {
        let name = a.field.name();

        if !seen.insert(a.field) {
            return Err(ValidationError::Duplicate {
                field: "data".to_string(),
                value: name.to_string(),
            });
        }

        if a.op.is_arithmetic() {
            if !a.field.kind().is_numeric() {
                return Err(ValidationError::UnsupportedOperation {
                    field: name.to_string(),
                    operation: format!("{:?}", a.op).to_lowercase(),
                });
            }
            if a.value.is_null() {
                return Err(ValidationError::Required {
                    field: name.to_string(),
                });
            }
            if a.op == UpdateOp::Divide && a.value.as_f64() == Some(0.0) {
                return Err(ValidationError::UnsupportedOperation {
                    field: name.to_string(),
                    operation: "divide by zero".to_string(),
                });
            }
        }

        a.field.check_value(&a.value)?;
    }

    Ok(())
}

// =============================================================================
// Lowering helpers used by the Update* inputs
// =============================================================================

pub(crate) fn push_set<F: Field, T: Into<Value> + Clone>(
    out: &mut Vec<Assignment<F>>,
    field: F,
    value: &Option<T>,
) {
    if let Some(v) = value {
        out.push(Assignment::set(field, v.clone()));
    }
}

pub(crate) fn push_nullable<F: Field, T: Into<Value> + Clone>(
    out: &mut Vec<Assignment<F>>,
    field: F,
    value: &Option<Option<T>>,
) {
    if let Some(v) = value {
        out.push(Assignment::set(field, v.clone()));
    }
}

pub(crate) fn push_number<F: Field, T: Into<Value> + Copy>(
    out: &mut Vec<Assignment<F>>,
    field: F,
    value: &Option<NumberUpdate<T>>,
) {
    if let Some(update) = value {
        out.push(update.to_assignment(field));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductField, StoreField};

    #[test]
    fn test_number_update_lowering() {
        let cases = [
            (NumberUpdate::Set(7i64), UpdateOp::Set),
            (NumberUpdate::Increment(7), UpdateOp::Increment),
            (NumberUpdate::Decrement(7), UpdateOp::Decrement),
            (NumberUpdate::Multiply(7), UpdateOp::Multiply),
            (NumberUpdate::Divide(7), UpdateOp::Divide),
        ];
        for (update, op) in cases {
            let a = update.to_assignment(ProductField::Stock);
            assert_eq!(a.field, ProductField::Stock);
            assert_eq!(a.op, op);
            assert_eq!(a.value, Value::Int(7));
            assert_eq!(update.set_value().is_some(), op == UpdateOp::Set);
        }
    }

    #[test]
    fn test_arithmetic_only_on_numeric_fields() {
        let ok_product = [NumberUpdate::Multiply(2i64).to_assignment(ProductField::Price)];
        let ok_store = [NumberUpdate::Divide(2.0).to_assignment(StoreField::TaxRate)];
        assert!(validate_assignments(&ok_product).is_ok());
        assert!(validate_assignments(&ok_store).is_ok());

        let on_text = [Assignment {
            field: ProductField::Name,
            op: UpdateOp::Increment,
            value: Value::Int(1),
        }];
        assert!(matches!(
            validate_assignments(&on_text),
            Err(ValidationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_divide_by_zero_rejected() {
        assert!(matches!(
            validate_assignments(&[NumberUpdate::Divide(0i64).to_assignment(ProductField::Stock)]),
            Err(ValidationError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            validate_assignments(&[NumberUpdate::Divide(0.0).to_assignment(StoreField::TaxRate)]),
            Err(ValidationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_null_and_duplicate_assignments() {
        let mut out = Vec::new();
        push_nullable::<_, String>(&mut out, ProductField::Image, &Some(None));
        assert!(validate_assignments(&out).is_ok());

        push_set(&mut out, ProductField::Name, &Some(Value::Null));
        assert!(matches!(
            validate_assignments(&out),
            Err(ValidationError::Required { .. })
        ));

        let twice = [
            Assignment::set(ProductField::Price, 1_000i64),
            NumberUpdate::Increment(500i64).to_assignment(ProductField::Price),
        ];
        assert!(matches!(
            validate_assignments(&twice),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_push_helpers_skip_absent_values() {
        let mut out: Vec<Assignment<ProductField>> = Vec::new();
        push_set::<_, String>(&mut out, ProductField::Name, &None);
        push_nullable::<_, String>(&mut out, ProductField::Image, &None);
        push_number::<_, i64>(&mut out, ProductField::Stock, &None);
        assert!(out.is_empty());

        push_number(&mut out, ProductField::Stock, &Some(NumberUpdate::Decrement(3i64)));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].op, UpdateOp::Decrement);
    }
}
