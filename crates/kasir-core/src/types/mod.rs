//! # Domain Types
//!
//! The nine persisted entities of the Kasir POS schema, plus their enums.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────┐ 1   n ┌────────────┐ n   1 ┌──────────┐                  │
//! │   │  Store   │◄──────│ UserStore  │──────►│   User   │                  │
//! │   └────┬─────┘       └────────────┘       └────┬─────┘                  │
//! │        │ 1                     defaultStore ▲  │ 1 (cashier)            │
//! │        ├───────────────────────────────────-┘  │                        │
//! │        │ n                                     │ n                      │
//! │   ┌────┴─────┐ 1   n ┌────────────┐       ┌────┴────────┐               │
//! │   │ Category │──────►│  Product   │       │ Transaction │◄── Store      │
//! │   └──────────┘       └─────┬──────┘       └──────┬──────┘               │
//! │                            │ 1                   │ 1                    │
//! │                            │ n                   │ n                    │
//! │                      ┌─────┴─────────────────────┴──┐                   │
//! │                      │       TransactionItem        │                   │
//! │                      └──────────────────────────────┘                   │
//! │                                                                         │
//! │   ┌──────────┐                      ┌───────────────┐                   │
//! │   │ Settings │ (global)             │ StoreSettings │──► Store          │
//! │   └──────────┘                      └───────────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Per-Entity Companions
//! Every entity `X` comes with:
//! - `XField`: one variant per column, implementing [`Field`](crate::query::Field)
//! - `XWhereUnique`: primary key and declared unique keys
//! - `CreateX`: insert input; `None` optionals fall back to schema defaults
//! - `UpdateX`: partial update; `Some(None)` on a nullable field sets NULL
//!
//! ## Identity
//! Ids are UUID v4 strings, generated by kasir-db when a create input leaves
//! `id` empty. JSON keys are camelCase; SQL columns are snake_case.

mod catalog;
mod enums;
mod settings;
mod store;
mod transaction;
mod user;

pub use catalog::*;
pub use enums::*;
pub use settings::*;
pub use store::*;
pub use transaction::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Deserializes a present-but-null JSON value as `Some(None)`.
///
/// Used on `Option<Option<T>>` update fields so that an absent key means
/// "leave unchanged" and an explicit `null` means "set NULL".
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
