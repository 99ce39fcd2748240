//! # Repository Module
//!
//! One generic [`Repository`] per entity, bound either to the pool or to an
//! open interactive transaction.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.products().find_many(&args)                                 │
//! │       │  tx.products().update(&unique, &data)                           │
//! │       ▼                                                                 │
//! │  Repository<'a, Product>                                                │
//! │  ├── source: Source::Pool(SqlitePool)       ← one pooled conn per call  │
//! │  │       or  Source::Tx(&Mutex<Transaction>) ← the transaction's conn   │
//! │  │                                                                      │
//! │  ├── generic surface (this file)                                        │
//! │  │   find_unique, find_many, create, update, upsert, delete, count,     │
//! │  │   aggregate, group_by, ...                                           │
//! │  │                                                                      │
//! │  └── entity extras (store.rs, user.rs, catalog.rs, transaction.rs, ...) │
//! │      relation loaders, relation counts, domain operations               │
//! │       │                                                                 │
//! │       │  SQL built by crud.rs / aggregate.rs                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StoreRepository`] - Stores and their relation counts
//! - [`UserRepository`], [`UserStoreRepository`] - Users and memberships
//! - [`CategoryRepository`], [`ProductRepository`] - Catalog and stock
//! - [`TransactionRepository`], [`TransactionItemRepository`] - Sales
//! - [`SettingsRepository`], [`StoreSettingsRepository`] - Key/value settings
//!
//! Every public method acquires its connection once and releases it before
//! returning. Methods never call other public methods while holding it: the
//! transaction connection sits behind a non-reentrant mutex.

pub mod catalog;
pub mod settings;
pub mod store;
pub mod transaction;
pub mod user;

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use kasir_core::query::{
    AggregateArgs, AggregateResult, BatchPayload, CountResult, CountSelect, Filter, GroupByArgs,
    GroupByRow, Selection,
};
use kasir_core::{
    Category, Entity, Product, Settings, Store, StoreSettings, Transaction, TransactionItem,
    UniqueWhere, User, UserStore,
};

use crate::aggregate;
use crate::crud::{self, Args, Model};
use crate::error::{DbError, DbResult};

pub type StoreRepository<'a> = Repository<'a, Store>;
pub type UserRepository<'a> = Repository<'a, User>;
pub type UserStoreRepository<'a> = Repository<'a, UserStore>;
pub type CategoryRepository<'a> = Repository<'a, Category>;
pub type ProductRepository<'a> = Repository<'a, Product>;
pub type TransactionRepository<'a> = Repository<'a, Transaction>;
pub type TransactionItemRepository<'a> = Repository<'a, TransactionItem>;
pub type SettingsRepository<'a> = Repository<'a, Settings>;
pub type StoreSettingsRepository<'a> = Repository<'a, StoreSettings>;

// =============================================================================
// Connection Source
// =============================================================================

/// Where a repository gets its connection from.
#[derive(Clone)]
pub enum Source<'a> {
    /// A fresh pooled connection per call.
    Pool(SqlitePool),
    /// The connection of an open interactive transaction.
    Tx(&'a Mutex<sqlx::Transaction<'static, Sqlite>>),
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Pool(pool) => f.debug_tuple("Pool").field(pool).finish(),
            Source::Tx(_) => f.write_str("Tx"),
        }
    }
}

impl Source<'_> {
    /// Acquires the connection for one repository call.
    pub(crate) async fn acquire(&self) -> DbResult<ConnGuard<'_>> {
        match self {
            Source::Pool(pool) => Ok(ConnGuard::Pooled(pool.acquire().await?)),
            Source::Tx(tx) => Ok(ConnGuard::Tx(tx.lock().await)),
        }
    }
}

/// A connection held for the duration of one repository call.
pub(crate) enum ConnGuard<'a> {
    Pooled(PoolConnection<Sqlite>),
    Tx(MutexGuard<'a, sqlx::Transaction<'static, Sqlite>>),
}

impl Deref for ConnGuard<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            ConnGuard::Pooled(conn) => &**conn,
            ConnGuard::Tx(tx) => &***tx,
        }
    }
}

impl DerefMut for ConnGuard<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            ConnGuard::Pooled(conn) => &mut **conn,
            ConnGuard::Tx(tx) => &mut ***tx,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Data access for entity `M`.
///
/// ## Example
/// ```rust,ignore
/// let cheap = db
///     .products()
///     .find_many(&FindArgs::<Product>::new()
///         .filter(Filter::field(ProductField::Price, Condition::Lt(10_000.into())))
///         .order_by(OrderBy::asc(ProductField::Price)))
///     .await?;
/// ```
pub struct Repository<'a, M> {
    source: Source<'a>,
    _entity: PhantomData<fn() -> M>,
}

impl<M: Entity> fmt::Debug for Repository<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &M::NAME)
            .field("source", &self.source)
            .finish()
    }
}

impl<M> Clone for Repository<'_, M> {
    fn clone(&self) -> Self {
        Repository {
            source: self.source.clone(),
            _entity: PhantomData,
        }
    }
}

impl<'a, M: Model> Repository<'a, M> {
    pub(crate) fn new(source: Source<'a>) -> Self {
        Repository {
            source,
            _entity: PhantomData,
        }
    }

    /// A repository for a related entity on the same connection source.
    pub fn related<R: Model>(&self) -> Repository<'a, R> {
        Repository::new(self.source.clone())
    }

    pub(crate) async fn conn(&self) -> DbResult<ConnGuard<'_>> {
        self.source.acquire().await
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Finds the row matching a primary key or declared unique.
    pub async fn find_unique(&self, unique: &M::Unique) -> DbResult<Option<M>> {
        debug!(entity = M::NAME, key = %unique.describe(), "find_unique");
        let mut conn = self.conn().await?;
        crud::find_unique::<M>(&mut conn, unique).await
    }

    /// Like [`find_unique`](Self::find_unique) but fails with `NotFound`.
    pub async fn find_unique_or_throw(&self, unique: &M::Unique) -> DbResult<M> {
        self.find_unique(unique)
            .await?
            .ok_or_else(|| DbError::not_found(M::NAME, unique.describe()))
    }

    /// Finds a row by primary key.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<M>> {
        let args = Args::<M>::new().filter(Filter::equals(M::ID, id));
        let mut conn = self.conn().await?;
        crud::find_first::<M>(&mut conn, &args).await
    }

    /// Finds a row by primary key, failing with `NotFound`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<M> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(M::NAME, format!("id={id}")))
    }

    pub async fn find_first(&self, args: &Args<M>) -> DbResult<Option<M>> {
        let mut conn = self.conn().await?;
        crud::find_first::<M>(&mut conn, args).await
    }

    pub async fn find_first_or_throw(&self, args: &Args<M>) -> DbResult<M> {
        self.find_first(args)
            .await?
            .ok_or_else(|| DbError::not_found(M::NAME, "no row matches the filter"))
    }

    pub async fn find_many(&self, args: &Args<M>) -> DbResult<Vec<M>> {
        let mut conn = self.conn().await?;
        crud::find_many::<M>(&mut conn, args).await
    }

    /// Reads rows and keeps only the selected fields of each.
    pub async fn find_many_selected(
        &self,
        args: &Args<M>,
        selection: &Selection<M::Field>,
    ) -> DbResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let mut conn = self.conn().await?;
        crud::find_many_selected::<M>(&mut conn, args, selection).await
    }

    /// Number of rows `find_many(args)` would return.
    pub async fn count(&self, args: &Args<M>) -> DbResult<i64> {
        let mut conn = self.conn().await?;
        crud::count::<M>(&mut conn, args).await
    }

    /// `_count` with `_all` and per-field non-null counts.
    pub async fn count_fields(
        &self,
        filter: Option<&Filter<M::Field>>,
        select: &CountSelect<M::Field>,
    ) -> DbResult<CountResult> {
        let mut conn = self.conn().await?;
        aggregate::count_fields::<M>(&mut conn, filter, select).await
    }

    pub async fn aggregate(&self, args: &AggregateArgs<M::Field, M::Unique>) -> DbResult<AggregateResult> {
        let mut conn = self.conn().await?;
        aggregate::aggregate::<M>(&mut conn, args).await
    }

    pub async fn group_by(&self, args: &GroupByArgs<M::Field>) -> DbResult<Vec<GroupByRow>> {
        let mut conn = self.conn().await?;
        aggregate::group_by::<M>(&mut conn, args).await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    pub async fn create(&self, data: M::Create) -> DbResult<M> {
        let mut conn = self.conn().await?;
        crud::create::<M>(&mut conn, data).await
    }

    /// Inserts all rows atomically. With `skip_duplicates`, rows hitting a
    /// unique constraint are skipped and not counted.
    pub async fn create_many(&self, data: Vec<M::Create>, skip_duplicates: bool) -> DbResult<BatchPayload> {
        let mut conn = self.conn().await?;
        crud::create_many::<M>(&mut conn, data, skip_duplicates).await
    }

    pub async fn update(&self, unique: &M::Unique, data: &M::Update) -> DbResult<M> {
        let mut conn = self.conn().await?;
        crud::update::<M>(&mut conn, unique, data).await
    }

    /// Applies `data` to every row matching `filter` (all rows when `None`).
    pub async fn update_many(&self, filter: Option<&Filter<M::Field>>, data: &M::Update) -> DbResult<BatchPayload> {
        let mut conn = self.conn().await?;
        crud::update_many::<M>(&mut conn, filter, data).await
    }

    pub async fn upsert(&self, unique: &M::Unique, create: M::Create, update: &M::Update) -> DbResult<M> {
        let mut conn = self.conn().await?;
        crud::upsert::<M>(&mut conn, unique, create, update).await
    }

    /// Deletes and returns the row.
    pub async fn delete(&self, unique: &M::Unique) -> DbResult<M> {
        let mut conn = self.conn().await?;
        crud::delete::<M>(&mut conn, unique).await
    }

    pub async fn delete_many(&self, filter: Option<&Filter<M::Field>>) -> DbResult<BatchPayload> {
        let mut conn = self.conn().await?;
        crud::delete_many::<M>(&mut conn, filter).await
    }
}

// =============================================================================
// Transaction Context
// =============================================================================

/// Repositories bound to one open transaction.
///
/// Handed to the callback of [`Database::transaction`](crate::Database::transaction).
/// Calls through it are serialized on the transaction's connection.
pub struct TxContext {
    pub(crate) conn: Mutex<sqlx::Transaction<'static, Sqlite>>,
}

impl fmt::Debug for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext").finish_non_exhaustive()
    }
}

impl TxContext {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        TxContext { conn: Mutex::new(tx) }
    }

    pub(crate) fn into_inner(self) -> sqlx::Transaction<'static, Sqlite> {
        self.conn.into_inner()
    }

    /// Repository for any entity, bound to this transaction.
    pub fn repo<M: Model>(&self) -> Repository<'_, M> {
        Repository::new(Source::Tx(&self.conn))
    }

    pub fn stores(&self) -> StoreRepository<'_> {
        self.repo()
    }

    pub fn users(&self) -> UserRepository<'_> {
        self.repo()
    }

    pub fn user_stores(&self) -> UserStoreRepository<'_> {
        self.repo()
    }

    pub fn categories(&self) -> CategoryRepository<'_> {
        self.repo()
    }

    pub fn products(&self) -> ProductRepository<'_> {
        self.repo()
    }

    pub fn transactions(&self) -> TransactionRepository<'_> {
        self.repo()
    }

    pub fn transaction_items(&self) -> TransactionItemRepository<'_> {
        self.repo()
    }

    pub fn settings(&self) -> SettingsRepository<'_> {
        self.repo()
    }

    pub fn store_settings(&self) -> StoreSettingsRepository<'_> {
        self.repo()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kasir_core::query::{
        AggregateFn, AggregateSelect, Condition, FindArgs, GroupOrderBy, NumberUpdate, OrderBy, SortOrder,
        Value,
    };
    use kasir_core::{
        CreateCategory, CreateProduct, CreateSettings, CreateStore, ProductField, ProductWhereUnique,
        SettingsWhereUnique, UpdateProduct, UpdateSettings,
    };

    /// In-memory database with one store, one category and `prices.len()`
    /// products named `P0`, `P1`, ...
    pub(crate) async fn catalog_fixture(prices: &[i64]) -> (Database, Store, Category, Vec<Product>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create(CreateStore::new("Toko Maju")).await.unwrap();
        let category = db
            .categories()
            .create(CreateCategory::new("Minuman", &store.id))
            .await
            .unwrap();

        let mut products = Vec::new();
        for (i, price) in prices.iter().enumerate() {
            let product = db
                .products()
                .create(CreateProduct::new(format!("P{i}"), *price, &category.id, &store.id).with_stock(10))
                .await
                .unwrap();
            products.push(product);
        }
        (db, store, category, products)
    }

    fn names(rows: &[Product]) -> Vec<&str> {
        rows.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_find_update_delete() {
        let (db, _, _, products) = catalog_fixture(&[5_000]).await;
        let id = products[0].id.clone();
        let unique = ProductWhereUnique::Id(id.clone());

        let found = db.products().find_unique_or_throw(&unique).await.unwrap();
        assert_eq!(found, products[0]);

        let update = UpdateProduct {
            price: Some(NumberUpdate::Increment(500)),
            image: Some(Some("kopi.png".into())),
            ..Default::default()
        };
        let updated = db.products().update(&unique, &update).await.unwrap();
        assert_eq!(updated.price, 5_500);
        assert_eq!(updated.image.as_deref(), Some("kopi.png"));
        assert!(updated.updated_at >= found.updated_at);

        let deleted = db.products().delete(&unique).await.unwrap();
        assert_eq!(deleted.id, id);
        assert!(db.products().find_by_id(&id).await.unwrap().is_none());

        let err = db.products().delete(&unique).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_negative_take_returns_requested_order() {
        let (db, _, _, _) = catalog_fixture(&[100, 200, 300, 400, 500]).await;

        let args = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Price))
            .take(-2);
        let rows = db.products().find_many(&args).await.unwrap();
        assert_eq!(names(&rows), vec!["P3", "P4"]);
    }

    #[tokio::test]
    async fn test_cursor_is_inclusive() {
        let (db, _, _, products) = catalog_fixture(&[100, 200, 300, 400, 500]).await;

        let args = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Price))
            .cursor(ProductWhereUnique::Id(products[2].id.clone()))
            .skip(1)
            .take(2);
        let rows = db.products().find_many(&args).await.unwrap();
        assert_eq!(names(&rows), vec!["P3", "P4"]);

        let backwards = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Price))
            .cursor(ProductWhereUnique::Id(products[2].id.clone()))
            .take(-2);
        let rows = db.products().find_many(&backwards).await.unwrap();
        assert_eq!(names(&rows), vec!["P1", "P2"]);

        let missing = FindArgs::<Product>::new().cursor(ProductWhereUnique::Id("nope".into()));
        assert!(db.products().find_many(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_over_nullable_column() {
        let (db, _, _, products) = catalog_fixture(&[100, 200, 300]).await;
        let set_image = UpdateProduct {
            image: Some(Some("b.png".into())),
            ..Default::default()
        };
        db.products()
            .update(&ProductWhereUnique::Id(products[1].id.clone()), &set_image)
            .await
            .unwrap();

        // NULLs first: P0/P2 (NULL, by id) then P1.
        let ordered = FindArgs::<Product>::new().order_by(OrderBy::asc(ProductField::Image).nulls_first());
        let all = db.products().find_many(&ordered).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].name, "P1");

        let from_second = ordered.clone().cursor(ProductWhereUnique::Id(all[1].id.clone()));
        let rows = db.products().find_many(&from_second).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, all[1].id);
        assert_eq!(rows[1].name, "P1");
    }

    #[tokio::test]
    async fn test_distinct_applies_before_paging() {
        let (db, _, _, _) = catalog_fixture(&[100, 100, 200, 200, 300]).await;

        let args = FindArgs::<Product>::new()
            .order_by(OrderBy::asc(ProductField::Name))
            .distinct(ProductField::Price)
            .skip(1);
        let rows = db.products().find_many(&args).await.unwrap();
        assert_eq!(names(&rows), vec!["P2", "P4"]);
        assert_eq!(db.products().count(&args).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_filter_combinators() {
        let (db, _, _, _) = catalog_fixture(&[100, 200, 300]).await;

        let none = FindArgs::<Product>::new().filter(Filter::Or(vec![]));
        assert!(db.products().find_many(&none).await.unwrap().is_empty());

        let all = FindArgs::<Product>::new().filter(Filter::And(vec![]));
        assert_eq!(db.products().count(&all).await.unwrap(), 3);

        let empty_in = FindArgs::<Product>::new().filter(Filter::is_in(ProductField::Name, Vec::<String>::new()));
        assert_eq!(db.products().count(&empty_in).await.unwrap(), 0);

        let not_in = FindArgs::<Product>::new().filter(Filter::field(ProductField::Name, Condition::NotIn(vec![])));
        assert_eq!(db.products().count(&not_in).await.unwrap(), 3);

        let not = FindArgs::<Product>::new().filter(Filter::not(Filter::field(
            ProductField::Price,
            Condition::Gte(Value::Int(200)),
        )));
        assert_eq!(db.products().count(&not).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let (db, store, category, _) = catalog_fixture(&[]).await;
        for name in ["Diskon 50%", "Diskon 505"] {
            db.products()
                .create(CreateProduct::new(name, 1_000, &category.id, &store.id))
                .await
                .unwrap();
        }

        let args = FindArgs::<Product>::new().filter(Filter::field(
            ProductField::Name,
            Condition::EndsWith("50%".into()),
        ));
        let rows = db.products().find_many(&args).await.unwrap();
        assert_eq!(names(&rows), vec!["Diskon 50%"]);
    }

    #[tokio::test]
    async fn test_validation_runs_before_sql() {
        let (db, _, _, _) = catalog_fixture(&[100]).await;

        let bad = FindArgs::<Product>::new().filter(Filter::equals(ProductField::Price, "mahal"));
        assert!(db.products().find_many(&bad).await.unwrap_err().is_validation());

        let divide = UpdateProduct {
            price: Some(NumberUpdate::Divide(0)),
            ..Default::default()
        };
        let err = db.products().update_many(None, &divide).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_update_many_and_delete_many_report_counts() {
        let (db, _, _, _) = catalog_fixture(&[100, 200, 300]).await;
        let cheap = Filter::field(ProductField::Price, Condition::Lt(Value::Int(250)));

        let restock = UpdateProduct {
            stock: Some(NumberUpdate::Increment(5)),
            ..Default::default()
        };
        let batch = db.products().update_many(Some(&cheap), &restock).await.unwrap();
        assert_eq!(batch, BatchPayload::new(2));
        let restocked = FindArgs::<Product>::new().filter(Filter::equals(ProductField::Stock, 15i64));
        assert_eq!(db.products().count(&restocked).await.unwrap(), 2);

        let nobody = Filter::equals(ProductField::Name, "tidak ada");
        assert_eq!(db.products().update_many(Some(&nobody), &restock).await.unwrap().count, 0);

        assert_eq!(db.products().delete_many(Some(&cheap)).await.unwrap().count, 2);
        assert_eq!(db.products().delete_many(None).await.unwrap().count, 1);
        assert_eq!(db.products().count(&FindArgs::<Product>::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_many_skip_duplicates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        let first = vec![
            CreateSettings::new("app.locale", "id-ID"),
            CreateSettings::new("printer.width", "58"),
        ];
        assert_eq!(settings.create_many(first, false).await.unwrap().count, 2);

        let again = vec![
            CreateSettings::new("printer.width", "80"),
            CreateSettings::new("receipt.footer", "Terima kasih"),
        ];
        let err = settings.create_many(again.clone(), false).await.unwrap_err();
        assert!(err.is_unique_violation(), "{err:?}");
        // All or nothing: the new key was not kept either.
        assert_eq!(settings.count(&FindArgs::<Settings>::new()).await.unwrap(), 2);

        assert_eq!(settings.create_many(again, true).await.unwrap().count, 1);
        assert_eq!(settings.get_value("printer.width").await.unwrap().as_deref(), Some("58"));
        assert_eq!(settings.count(&FindArgs::<Settings>::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unique = SettingsWhereUnique::Key("app.theme".into());

        let created = db
            .settings()
            .upsert(&unique, CreateSettings::new("app.theme", "light"), &UpdateSettings::value("dark"))
            .await
            .unwrap();
        assert_eq!(created.value, "light");

        let updated = db
            .settings()
            .upsert(&unique, CreateSettings::new("app.theme", "light"), &UpdateSettings::value("dark"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.value, "dark");
        assert_eq!(db.settings().count(&FindArgs::<Settings>::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_functions_and_empty_set() {
        let (db, _, _, _) = catalog_fixture(&[100, 200, 600]).await;
        let select = AggregateSelect::new()
            .count(CountSelect::all())
            .avg(ProductField::Price)
            .sum(ProductField::Price)
            .min(ProductField::Price)
            .max(ProductField::Price);

        let result = db.products().aggregate(&AggregateArgs::new(select.clone())).await.unwrap();
        assert_eq!(result.count_all(), 3);
        assert_eq!(result.avg["price"], Value::Float(300.0));
        assert_eq!(result.sum["price"], Value::Int(900));
        assert_eq!(result.min["price"], Value::Int(100));
        assert_eq!(result.max["price"], Value::Int(600));

        // Aggregates run over the ordered, limited window.
        let mut top_two = AggregateArgs::new(AggregateSelect::new().sum(ProductField::Price));
        top_two.find = FindArgs::<Product>::new().order_by(OrderBy::desc(ProductField::Price)).take(2);
        let result = db.products().aggregate(&top_two).await.unwrap();
        assert_eq!(result.sum["price"], Value::Int(800));

        let none = AggregateArgs::new(select).filter(Filter::field(
            ProductField::Price,
            Condition::Gt(Value::Int(1_000)),
        ));
        let result = db.products().aggregate(&none).await.unwrap();
        assert_eq!(result.count_all(), 0);
        for values in [&result.avg, &result.sum, &result.min, &result.max] {
            assert_eq!(values["price"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_count_fields_counts_non_null() {
        let (db, _, _, products) = catalog_fixture(&[100, 200, 300]).await;
        let with_image = UpdateProduct {
            image: Some(Some("kopi.png".into())),
            ..Default::default()
        };
        db.products()
            .update(&ProductWhereUnique::Id(products[0].id.clone()), &with_image)
            .await
            .unwrap();

        let select = CountSelect::all().field(ProductField::Image).field(ProductField::Name);
        let counts = db.products().count_fields(None, &select).await.unwrap();
        assert_eq!(counts.all, Some(3));
        assert_eq!(counts.fields["image"], 1);
        assert_eq!(counts.fields["name"], 3);

        let pricey = Filter::field(ProductField::Price, Condition::Gte(Value::Int(200)));
        let counts = db.products().count_fields(Some(&pricey), &select).await.unwrap();
        assert_eq!(counts.all, Some(2));
        assert_eq!(counts.fields["image"], 0);
    }

    #[tokio::test]
    async fn test_group_by_orders_by_aggregate_with_paging() {
        let (db, store, drinks, _) = catalog_fixture(&[100, 200]).await;
        let snacks = db
            .categories()
            .create(CreateCategory::new("Snack", &store.id))
            .await
            .unwrap();
        let cigarettes = db
            .categories()
            .create(CreateCategory::new("Rokok", &store.id))
            .await
            .unwrap();
        for (price, category) in [(500, &snacks), (700, &snacks), (50, &cigarettes)] {
            db.products()
                .create(CreateProduct::new(format!("X{price}"), price, &category.id, &store.id))
                .await
                .unwrap();
        }

        // Sums: snacks 1200, drinks 300, cigarettes 50.
        let by_sum = GroupByArgs::new([ProductField::CategoryId])
            .select(AggregateSelect::new().count(CountSelect::all()).sum(ProductField::Price))
            .order_by(GroupOrderBy::aggregate(AggregateFn::Sum, ProductField::Price, SortOrder::Desc));

        let rows = db.products().group_by(&by_sum.clone().take(2)).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key("categoryId").cloned()).collect();
        assert_eq!(
            keys,
            vec![Some(Value::Text(snacks.id.clone())), Some(Value::Text(drinks.id.clone()))]
        );

        let rows = db.products().group_by(&by_sum.skip(1).take(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key("categoryId"), Some(&Value::Text(drinks.id.clone())));
        assert_eq!(rows[0].aggregates.sum["price"], Value::Int(300));
        assert_eq!(rows[0].aggregates.count_all(), 2);
    }

    #[tokio::test]
    async fn test_find_many_selected_projects_fields() {
        let (db, _, _, _) = catalog_fixture(&[100, 200]).await;
        let args = FindArgs::<Product>::new().order_by(OrderBy {
            field: ProductField::Price,
            order: SortOrder::Desc,
            nulls: None,
        });
        let rows = db
            .products()
            .find_many_selected(&args, &Selection::new([ProductField::Name, ProductField::Price]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["price"], 200);
        assert!(!rows[0].contains_key("stock"));
    }
}
