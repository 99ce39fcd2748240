//! # Filters
//!
//! Predicate trees used by every `where` argument.
//!
//! ```text
//! Filter::and([
//!     Filter::equals(ProductField::StoreId, "store-1"),
//!     Filter::or([
//!         Filter::field(ProductField::Name, Condition::Contains("kopi")),
//!         Filter::field(ProductField::Stock, Condition::Lte(5)),
//!     ]),
//!     Filter::not(Filter::field(ProductField::Image, Condition::IsNull)),
//! ])
//! ```
//!
//! ## Empty Combinators
//! - `AND []` matches every row
//! - `OR []` matches no row
//! - `in []` matches no row, `notIn []` matches every row

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::ValidationResult;

// =============================================================================
// Condition
// =============================================================================

/// A single comparison applied to one field (or aggregate expression).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals(Value),
    Not(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

impl Condition {
    /// Operator name as it appears in the query API.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Equals(_) => "equals",
            Condition::Not(_) => "not",
            Condition::In(_) => "in",
            Condition::NotIn(_) => "notIn",
            Condition::Lt(_) => "lt",
            Condition::Lte(_) => "lte",
            Condition::Gt(_) => "gt",
            Condition::Gte(_) => "gte",
            Condition::Contains(_) => "contains",
            Condition::StartsWith(_) => "startsWith",
            Condition::EndsWith(_) => "endsWith",
            Condition::IsNull => "isNull",
            Condition::IsNotNull => "isNotNull",
        }
    }

    /// Validates the condition against a target of the given kind.
    ///
    /// `nullable` says whether the target may be NULL (a nullable column, or an
    /// aggregate such as `_avg` over an empty group).
    pub fn check(&self, target: &str, kind: FieldKind, nullable: bool) -> ValidationResult<()> {
        let unsupported = || ValidationError::UnsupportedOperation {
            field: target.to_string(),
            operation: self.operator().to_string(),
        };

        match self {
            Condition::Equals(v) | Condition::Not(v) => {
                if v.is_null() {
                    if nullable {
                        Ok(())
                    } else {
                        Err(ValidationError::Required {
                            field: target.to_string(),
                        })
                    }
                } else {
                    kind.check(target, v)
                }
            }
            Condition::In(values) | Condition::NotIn(values) => {
                for v in values {
                    if v.is_null() {
                        return Err(ValidationError::TypeMismatch {
                            field: target.to_string(),
                            expected: kind.describe().to_string(),
                            actual: "null".to_string(),
                        });
                    }
                    kind.check(target, v)?;
                }
                Ok(())
            }
            Condition::Lt(v) | Condition::Lte(v) | Condition::Gt(v) | Condition::Gte(v) => {
                if !kind.supports_range() {
                    return Err(unsupported());
                }
                if v.is_null() {
                    return Err(ValidationError::Required {
                        field: target.to_string(),
                    });
                }
                kind.check(target, v)
            }
            Condition::Contains(_) | Condition::StartsWith(_) | Condition::EndsWith(_) => {
                if kind.supports_string_match() {
                    Ok(())
                } else {
                    Err(unsupported())
                }
            }
            Condition::IsNull | Condition::IsNotNull => {
                if nullable {
                    Ok(())
                } else {
                    Err(unsupported())
                }
            }
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A boolean predicate over the fields `F` of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter<F> {
    Field { field: F, condition: Condition },
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
    Not(Box<Filter<F>>),
}

impl<F: Field> Filter<F> {
    /// `field <condition>`.
    pub fn field(field: F, condition: Condition) -> Self {
        Filter::Field { field, condition }
    }

    /// `field = value`.
    pub fn equals(field: F, value: impl Into<Value>) -> Self {
        Filter::field(field, Condition::Equals(value.into()))
    }

    /// `field IN (values…)`.
    pub fn is_in<V: Into<Value>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Filter::field(field, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    /// Conjunction of all filters.
    pub fn and(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Disjunction of all filters.
    pub fn or(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter<F>) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Combines this filter with another one under AND, flattening nested ANDs.
    pub fn and_also(self, other: Filter<F>) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Validates every condition against its field's type.
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            Filter::Field { field, condition } => {
                condition.check(field.name(), field.kind(), field.nullable())
            }
            Filter::And(parts) | Filter::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate())
            }
            Filter::Not(inner) => inner.validate(),
        }
    }

    /// All fields referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<F> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<F>) {
        match self {
            Filter::Field { field, .. } => out.push(*field),
            Filter::And(parts) | Filter::Or(parts) => {
                parts.iter().for_each(|p| p.collect_fields(out))
            }
            Filter::Not(inner) => inner.collect_fields(out),
        }
    }
}

/// Combines an optional filter with an extra clause.
pub fn and_optional<F: Field>(base: Option<Filter<F>>, extra: Filter<F>) -> Filter<F> {
    match base {
        Some(filter) => filter.and_also(extra),
        None => extra,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
