//! # kasir-core: Schema Types and Query Arguments for Kasir POS
//!
//! This crate describes the Kasir POS data model and everything a caller can
//! ask of it, without performing any I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Access                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (API handlers, seed, tests)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   query   │  │   money   │  │ validation│  │   │
//! │  │   │  Store    │  │  Filter   │  │   Money   │  │   rules   │  │   │
//! │  │   │  Product  │  │  OrderBy  │  │  change   │  │  checks   │  │   │
//! │  │   │  ...      │  │  GroupBy  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, repositories, relations      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Store, User, Product, Transaction, ...) and enums
//! - [`entity`] - Traits tying an entity to its field/unique/input types
//! - [`query`] - Filters, ordering, pagination, update ops, aggregates
//! - [`money`] - Integer money in minor units
//! - [`error`] - Domain and validation error types
//! - [`validation`] - Domain validators used by create/update inputs
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::query::{Condition, Filter, FindArgs, OrderBy};
//! use kasir_core::{Product, ProductField};
//!
//! let args: FindArgs<Product> = FindArgs::<Product>::new()
//!     .filter(Filter::field(ProductField::Stock, Condition::Lte(5.into())))
//!     .order_by(OrderBy::asc(ProductField::Name))
//!     .take(20);
//!
//! assert!(args.validate().is_ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entity;
pub mod error;
pub mod money;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entity::{CreateInput, Entity, UniqueWhere, UpdateInput};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency applied by the schema when a store is created without one.
pub const DEFAULT_CURRENCY: &str = "IDR";

/// Category applied by the schema when a setting is created without one.
pub const DEFAULT_SETTINGS_CATEGORY: &str = "general";

/// Maximum length of display names (stores, users, categories, products).
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum quantity of a single transaction line.
///
/// Guards against keying 100000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;
