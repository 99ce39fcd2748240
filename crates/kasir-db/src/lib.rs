//! # kasir-db: Database Layer for Kasir POS
//!
//! This crate provides database access for the Kasir POS schema.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  Caller (API handler, seed binary, test)                               │
//! │       │  FindArgs / CreateX / UpdateX from kasir-core                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ Repository<M> │    │ 001_initial_ │  │   │
//! │  │   │ transaction() │◄───│ relations     │    │   schema.sql │  │   │
//! │  │   │ DbConfig      │    │ domain ops    │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │              crud.rs / aggregate.rs / sql.rs                   │   │
//! │  │              (QueryBuilder, bound parameters only)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, repository accessors, interactive transactions
//! - [`config`] - TOML / environment settings
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Generic repository plus per-entity relations and operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{Database, DatabaseSettings};
//!
//! let db = Database::new(DatabaseSettings::load(None)?.into_db_config()).await?;
//!
//! let low_stock = db
//!     .products()
//!     .find_many(&FindArgs::<Product>::new()
//!         .filter(Filter::field(ProductField::Stock, Condition::Lte(5.into()))))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

mod aggregate;
mod crud;
mod relations;
mod sql;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, TransactionSettings};
pub use crud::Model;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, TransactionOptions};
pub use repository::{Repository, Source, TxContext};

// Repository re-exports for convenience
pub use repository::catalog::{CategoryCount, CategoryWithProducts, ProductCount};
pub use repository::store::StoreCount;
pub use repository::transaction::{TransactionCount, TransactionWithItems};
pub use repository::user::{UserCount, UserWithMemberships};
pub use repository::{
    CategoryRepository, ProductRepository, SettingsRepository, StoreRepository,
    StoreSettingsRepository, TransactionItemRepository, TransactionRepository, UserRepository,
    UserStoreRepository,
};
