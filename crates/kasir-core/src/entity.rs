//! # Entity Traits
//!
//! The contract between an entity's type definitions and the generic
//! data-access code in kasir-db.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  impl Entity for Product                                                │
//! │     type Field  = ProductField        columns + metadata                │
//! │     type Unique = ProductWhereUnique  id                                │
//! │     type Create = CreateProduct       INSERT input                      │
//! │     type Update = UpdateProduct       UPDATE input                      │
//! │     TABLE       = "products"                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt::Debug;

use crate::query::filter::Filter;
use crate::query::update::Assignment;
use crate::query::value::{Field, Value};
use crate::validation::ValidationResult;

/// A persisted record type corresponding to one table.
pub trait Entity: Clone + Debug + Serialize + Send + Sync + Unpin + 'static {
    type Field: Field;
    type Unique: UniqueWhere<Self::Field>;
    type Create: CreateInput<Self::Field>;
    type Update: UpdateInput<Self::Field>;

    /// Display name used in errors and logs.
    const NAME: &'static str;
    /// SQL table name.
    const TABLE: &'static str;

    const ID: Self::Field;
    const CREATED_AT: Self::Field;
    const UPDATED_AT: Self::Field;

    /// Primary key.
    fn id(&self) -> &str;

    /// Reads one field as a dynamic value.
    fn value_of(&self, field: Self::Field) -> Value;

    /// Follow-up update restoring columns derived from other columns, given
    /// the row as written by `update`. `Ok(None)` when the row is consistent.
    ///
    /// Fails when `update` itself supplied a derived value that disagrees
    /// with the row.
    fn derived_update(&self, _update: &Self::Update) -> ValidationResult<Option<Self::Update>> {
        Ok(None)
    }
}

/// Selector resolving to at most one row: primary key or a declared unique.
pub trait UniqueWhere<F: Field>: Clone + Debug + Send + Sync + 'static {
    /// Equivalent filter (a compound unique becomes an AND of equalities).
    fn to_filter(&self) -> Filter<F>;

    /// Short description for NotFound errors, e.g. `username=budi`.
    fn describe(&self) -> String;
}

/// Input of `create`.
///
/// Optional fields left as `None` are omitted from the INSERT so the schema
/// default applies.
pub trait CreateInput<F: Field>: Clone + Debug + Send + Sync + 'static {
    /// Domain validation of the provided values.
    fn validate(&self) -> ValidationResult<()>;

    /// Column/value pairs to insert (without timestamps).
    fn into_values(self) -> Vec<(F, Value)>;
}

/// Input of `update` / `updateMany`.
pub trait UpdateInput<F: Field>: Clone + Debug + Default + Send + Sync + 'static {
    /// Domain validation of the provided values.
    fn validate(&self) -> ValidationResult<()>;

    /// SET clauses (without `updatedAt`).
    fn assignments(&self) -> Vec<Assignment<F>>;
}

/// Pushes `(field, value)` when a value is present.
pub(crate) fn push_opt<F: Field, T: Into<Value>>(
    out: &mut Vec<(F, Value)>,
    field: F,
    value: Option<T>,
) {
    if let Some(v) = value {
        out.push((field, v.into()));
    }
}
