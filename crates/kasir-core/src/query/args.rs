//! # Read Arguments
//!
//! Ordering, pagination, cursor, distinct and field selection for
//! `findMany`-style reads.
//!
//! ## Pagination Model
//! ```text
//! rows ordered by orderBy + id
//!   ┌────┬────┬────┬────┬────┬────┬────┐
//!   │ r1 │ r2 │ r3 │ r4 │ r5 │ r6 │ r7 │
//!   └────┴────┴────┴────┴────┴────┴────┘
//!              ▲ cursor (inclusive)
//!              ├─ skip 1 ─┤
//!                   ├── take 2 ──┤      → [r4, r5]
//!
//! take -2 from cursor r5: walk backwards → [r4, r5] (order preserved)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::entity::Entity;
use crate::error::ValidationError;
use crate::query::filter::{and_optional, Filter};
use crate::query::value::Field;
use crate::validation::ValidationResult;

// =============================================================================
// Ordering
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    fn reversed(self) -> Self {
        match self {
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

/// One `orderBy` entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBy<F> {
    pub field: F,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,
}

impl<F: Field> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        OrderBy {
            field,
            order: SortOrder::Asc,
            nulls: None,
        }
    }

    pub fn desc(field: F) -> Self {
        OrderBy {
            field,
            order: SortOrder::Desc,
            nulls: None,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    /// Same field, flipped direction (used for negative `take`).
    pub fn reversed(self) -> Self {
        OrderBy {
            field: self.field,
            order: self.order.reversed(),
            nulls: self.nulls.map(NullsOrder::reversed),
        }
    }
}

// =============================================================================
// FindManyArgs
// =============================================================================

/// Arguments for `find_many`, `find_first`, `count` and `aggregate`.
///
/// `U` is the entity's unique selector, used as the cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "F: Deserialize<'de>, U: Deserialize<'de>")
)]
pub struct FindManyArgs<F, U> {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter<F>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy<F>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<U>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinct: Vec<F>,
}

/// `FindManyArgs` for entity `E`.
pub type FindArgs<E> = FindManyArgs<<E as Entity>::Field, <E as Entity>::Unique>;

impl<F, U> Default for FindManyArgs<F, U> {
    fn default() -> Self {
        FindManyArgs {
            filter: None,
            order_by: Vec::new(),
            cursor: None,
            take: None,
            skip: None,
            distinct: Vec::new(),
        }
    }
}

impl<F: Field, U> FindManyArgs<F, U> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `where` filter, replacing any previous one.
    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// ANDs an extra clause into the `where` filter.
    pub fn and_where(mut self, extra: Filter<F>) -> Self {
        self.filter = Some(and_optional(self.filter.take(), extra));
        self
    }

    pub fn order_by(mut self, order: OrderBy<F>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn cursor(mut self, cursor: U) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn distinct(mut self, field: F) -> Self {
        self.distinct.push(field);
        self
    }

    /// Validates filter types and pagination bounds.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }

        if let Some(skip) = self.skip {
            if skip < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "skip".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }

        let mut seen = HashSet::new();
        for order in &self.order_by {
            if !seen.insert(order.field) {
                return Err(ValidationError::Duplicate {
                    field: "orderBy".to_string(),
                    value: order.field.name().to_string(),
                });
            }
        }

        Ok(())
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Field selection (`select`) applied to read results.
///
/// Rows are still read in full; the projection keeps only the selected keys
/// of the serialized entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection<F> {
    pub fields: Vec<F>,
}

impl<F: Field> Selection<F> {
    pub fn new(fields: impl IntoIterator<Item = F>) -> Self {
        Selection {
            fields: fields.into_iter().collect(),
        }
    }

    /// Projects an entity onto the selected fields.
    pub fn project<E: Serialize>(
        &self,
        entity: &E,
    ) -> serde_json::Result<serde_json::Map<String, serde_json::Value>> {
        let mut full = match serde_json::to_value(entity)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        let mut out = serde_json::Map::new();
        for field in &self.fields {
            if let Some(value) = full.remove(field.name()) {
                out.insert(field.name().to_string(), value);
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Batch Payload
// =============================================================================

/// Affected-row count returned by `createMany`, `updateMany`, `deleteMany`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchPayload {
    pub count: u64,
}

impl BatchPayload {
    pub fn new(count: u64) -> Self {
        BatchPayload { count }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, ProductField};
    use chrono::Utc;

    #[test]
    fn test_negative_skip_rejected() {
        let args = FindArgs::<Product>::new().skip(-1);
        assert!(matches!(
            args.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_negative_take_allowed() {
        let args = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Name))
            .take(-3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_duplicate_order_by_rejected() {
        let args = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Name))
            .order_by(OrderBy::desc(ProductField::Name));
        assert!(matches!(
            args.validate(),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_reversed_order_flips_nulls() {
        let order = OrderBy::asc(ProductField::Image).nulls_first().reversed();
        assert_eq!(order.order, SortOrder::Desc);
        assert_eq!(order.nulls, Some(NullsOrder::Last));
    }

    #[test]
    fn test_selection_projects_requested_keys() {
        let now = Utc::now();
        let product = Product {
            id: "p1".into(),
            name: "Kopi Susu".into(),
            description: None,
            price: 18_000,
            stock: 12,
            image: None,
            category_id: "c1".into(),
            store_id: "s1".into(),
            created_at: now,
            updated_at: now,
        };

        let projected = Selection::new([ProductField::Name, ProductField::Price])
            .project(&product)
            .unwrap();
        assert_eq!(projected.len(), 2);
        assert_eq!(projected["price"], 18_000);
        assert!(!projected.contains_key("stock"));
    }

    #[test]
    fn test_where_key_in_json() {
        let args: FindArgs<Product> =
            serde_json::from_str(r#"{"where":{"field":{"field":"name","condition":{"contains":"kopi"}}},"take":5}"#)
                .unwrap();
        assert!(args.filter.is_some());
        assert_eq!(args.take, Some(5));
    }
}
