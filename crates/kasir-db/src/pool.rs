//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite, plus interactive
//! transactions.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Application Startup                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← or DatabaseSettings::load(..).into_db_config()  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ├── db.products().find_many(..)   one pooled conn per call       │
//! │       │                                                                 │
//! │       └── db.transaction(|tx| ..)       one conn for the whole closure │
//! │              BEGIN ─► tx.products() / tx.transactions() ─► COMMIT      │
//! │                                          error / timeout ─► ROLLBACK   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use futures_util::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::crud::Model;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CategoryRepository, ProductRepository, Repository, SettingsRepository, Source,
    StoreRepository, StoreSettingsRepository, TransactionItemRepository, TransactionRepository,
    TxContext, UserRepository, UserStoreRepository,
};

// =============================================================================
// Configuration
// =============================================================================

/// Time limits of an interactive transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Longest wait for a connection and `BEGIN`.
    /// Default: 2 seconds
    pub max_wait: Duration,

    /// Longest run time of the transaction callback.
    /// Default: 5 seconds
    pub timeout: Duration,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        TransactionOptions {
            max_wait: Duration::from_millis(2_000),
            timeout: Duration::from_millis(5_000),
        }
    }
}

impl TransactionOptions {
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/kasir.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a single outlet)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Limits applied by [`Database::transaction`].
    pub transaction: TransactionOptions,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            transaction: TransactionOptions::default(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the default interactive transaction limits.
    pub fn transaction_options(mut self, options: TransactionOptions) -> Self {
        self.transaction = options;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = DbConfig::in_memory();
    /// let db = Database::new(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            transaction: TransactionOptions::default(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./kasir.db")).await?;
///
/// let store = db.stores().create(CreateStore::new("Toko Maju")).await?;
/// let sale = db
///     .transaction(|tx| Box::pin(async move {
///         let sale = tx.transactions().create_with_items(input).await?;
///         tx.products().adjust_stock(&product_id, -2).await?;
///         Ok(sale)
///     }))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Defaults for [`Database::transaction`].
    tx_options: TransactionOptions,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (referential actions depend on it)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            tx_options: config.transaction,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// ## When To Call
    /// - Automatically called by `new()` if `run_migrations` is true
    /// - Manually call when migrations are disabled in config
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    /// Repository for any entity, bound to the pool.
    pub fn repo<M: Model>(&self) -> Repository<'static, M> {
        Repository::new(Source::Pool(self.pool.clone()))
    }

    pub fn stores(&self) -> StoreRepository<'static> {
        self.repo()
    }

    pub fn users(&self) -> UserRepository<'static> {
        self.repo()
    }

    pub fn user_stores(&self) -> UserStoreRepository<'static> {
        self.repo()
    }

    pub fn categories(&self) -> CategoryRepository<'static> {
        self.repo()
    }

    /// Returns the product repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let low = db.products().find_many(&FindArgs::<Product>::new()
    ///     .filter(Filter::field(ProductField::Stock, Condition::Lte(5.into())))).await?;
    /// ```
    pub fn products(&self) -> ProductRepository<'static> {
        self.repo()
    }

    pub fn transactions(&self) -> TransactionRepository<'static> {
        self.repo()
    }

    pub fn transaction_items(&self) -> TransactionItemRepository<'static> {
        self.repo()
    }

    pub fn settings(&self) -> SettingsRepository<'static> {
        self.repo()
    }

    pub fn store_settings(&self) -> StoreSettingsRepository<'static> {
        self.repo()
    }

    // -------------------------------------------------------------------------
    // Interactive Transactions
    // -------------------------------------------------------------------------

    /// Runs `f` inside one transaction with the configured default limits.
    ///
    /// Commits when `f` returns `Ok`, rolls back on `Err` or timeout.
    pub async fn transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: for<'t> FnOnce(&'t TxContext) -> BoxFuture<'t, DbResult<T>>,
    {
        self.transaction_with(self.tx_options, f).await
    }

    /// Runs `f` inside one transaction.
    ///
    /// ## Timeline
    /// ```text
    /// acquire + BEGIN ──(max_wait)──► f(&tx) ──(timeout)──► COMMIT
    ///        │                           │
    ///        └─ TransactionTimeout       ├─ Err(e)  → ROLLBACK, Err(e)
    ///           { stage: "max_wait" }    └─ timeout → ROLLBACK,
    ///                                       TransactionTimeout { stage: "timeout" }
    /// ```
    pub async fn transaction_with<F, T>(&self, options: TransactionOptions, f: F) -> DbResult<T>
    where
        F: for<'t> FnOnce(&'t TxContext) -> BoxFuture<'t, DbResult<T>>,
    {
        let tx = match timeout(options.max_wait, self.pool.begin()).await {
            Ok(tx) => tx.map_err(|e| DbError::TransactionFailed(e.to_string()))?,
            Err(_) => {
                warn!(max_wait_ms = millis(options.max_wait), "Timed out starting transaction");
                return Err(DbError::TransactionTimeout {
                    stage: "max_wait".to_string(),
                    millis: millis(options.max_wait),
                });
            }
        };
        debug!("Transaction started");

        let ctx = TxContext::new(tx);
        let outcome = timeout(options.timeout, f(&ctx)).await;
        let tx = ctx.into_inner();

        match outcome {
            Ok(Ok(value)) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                debug!("Transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Transaction rolled back");
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                Err(err)
            }
            Err(_) => {
                warn!(timeout_ms = millis(options.timeout), "Transaction timed out, rolling back");
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                Err(DbError::TransactionTimeout {
                    stage: "timeout".to_string(),
                    millis: millis(options.timeout),
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::query::FindArgs;
    use kasir_core::{CreateStore, Store, StoreWhereUnique, UpdateStore};

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory();
        let db = Database::new(config).await.unwrap();

        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .transaction_options(TransactionOptions::default().timeout(Duration::from_secs(1)));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.transaction.timeout, Duration::from_secs(1));
        assert_eq!(config.transaction.max_wait, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let store = db
            .transaction(|tx| {
                Box::pin(async move {
                    let store = tx.stores().create(CreateStore::new("Toko A")).await?;
                    let update = UpdateStore {
                        currency: Some("USD".into()),
                        ..Default::default()
                    };
                    tx.stores()
                        .update(&StoreWhereUnique::Id(store.id.clone()), &update)
                        .await
                })
            })
            .await
            .unwrap();

        let found = db.stores().get_by_id(&store.id).await.unwrap();
        assert_eq!(found.currency, "USD");
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result: DbResult<()> = db
            .transaction(|tx| {
                Box::pin(async move {
                    tx.stores().create(CreateStore::new("Toko B")).await?;
                    Err(DbError::Internal("abort".into()))
                })
            })
            .await;
        assert!(result.is_err());

        let stores = db.stores().find_many(&FindArgs::<Store>::new()).await.unwrap();
        assert!(stores.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_timeout_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let options = TransactionOptions::default().timeout(Duration::from_millis(50));

        let result: DbResult<()> = db
            .transaction_with(options, |tx| {
                Box::pin(async move {
                    tx.stores().create(CreateStore::new("Toko C")).await?;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(())
                })
            })
            .await;
        assert!(matches!(
            result,
            Err(DbError::TransactionTimeout { ref stage, .. }) if stage == "timeout"
        ));

        let count = db.stores().count(&FindArgs::<Store>::new()).await.unwrap();
        assert_eq!(count, 0);
    }
}
