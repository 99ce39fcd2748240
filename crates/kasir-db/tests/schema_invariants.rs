//! Schema-level guarantees checked through the public repository surface.
//!
//! Every test runs against its own in-memory database with the embedded
//! migration applied.

use kasir_core::query::{
    AggregateFn, AggregateSelect, CountSelect, FindArgs, GroupByArgs, GroupOrderBy, Having, SortOrder,
};
use kasir_core::query::{Condition, Filter, NumberUpdate};
use kasir_core::{
    CreateCategory, CreateProduct, CreateSettings, CreateStore, CreateStoreSettings, CreateTransaction,
    CreateTransactionItem, CreateUser, CreateUserStore, PaymentMethod, Product, ProductField,
    ProductWhereUnique, Role, Store, StoreField, Transaction, TransactionField, TransactionItem,
    TransactionItemField, TransactionItemWhereUnique, TransactionStatus, TransactionWhereUnique,
    UpdateTransaction, UpdateTransactionItem, User, ValidationError, DEFAULT_CURRENCY,
};
use kasir_db::{Database, DbConfig, DbError};

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    db: Database,
    store: Store,
    cashier: User,
    products: Vec<Product>,
}

async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let store = db.stores().create(CreateStore::new("Toko Sinar")).await.unwrap();

    let mut input = CreateUser::new("Kasir Satu", "kasir1", "hash");
    input.role = Some(Role::Kasir);
    let cashier = db.users().create(input).await.unwrap();

    let category = db
        .categories()
        .create(CreateCategory::new("Sembako", &store.id))
        .await
        .unwrap();

    let mut products = Vec::new();
    for (name, price, stock) in [("Beras", 72_000, 10), ("Gula", 17_500, 0), ("Minyak", 36_000, 4)] {
        let product = db
            .products()
            .create(CreateProduct::new(name, price, &category.id, &store.id).with_stock(stock))
            .await
            .unwrap();
        products.push(product);
    }

    Fixture {
        db,
        store,
        cashier,
        products,
    }
}

async fn pending_sale(fx: &Fixture, total: i64) -> Transaction {
    fx.db
        .transactions()
        .create(CreateTransaction::new(total, PaymentMethod::Cash, &fx.cashier.id, &fx.store.id))
        .await
        .unwrap()
}

// =============================================================================
// Unique constraints
// =============================================================================

#[tokio::test]
async fn duplicate_membership_is_rejected() {
    let fx = fixture().await;
    let memberships = fx.db.user_stores();

    memberships
        .create(CreateUserStore::new(&fx.cashier.id, &fx.store.id, Role::Kasir))
        .await
        .unwrap();
    let err = memberships
        .create(CreateUserStore::new(&fx.cashier.id, &fx.store.id, Role::Admin))
        .await
        .unwrap_err();

    match err {
        DbError::UniqueViolation { field, .. } => assert_eq!(field, "user_id, store_id"),
        other => panic!("expected UniqueViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_store_setting_is_rejected() {
    let fx = fixture().await;
    let other = fx.db.stores().create(CreateStore::new("Toko Lain")).await.unwrap();

    fx.db
        .store_settings()
        .create(CreateStoreSettings::new(&fx.store.id, "printer.width", "58"))
        .await
        .unwrap();
    // Same key in another store is fine.
    fx.db
        .store_settings()
        .create(CreateStoreSettings::new(&other.id, "printer.width", "80"))
        .await
        .unwrap();

    let err = fx
        .db
        .store_settings()
        .create(CreateStoreSettings::new(&fx.store.id, "printer.width", "80"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "got {err:?}");
}

#[tokio::test]
async fn duplicate_username_and_settings_key_are_rejected() {
    let fx = fixture().await;

    let err = fx
        .db
        .users()
        .create(CreateUser::new("Orang Lain", "kasir1", "hash"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "got {err:?}");

    fx.db
        .settings()
        .create(CreateSettings::new("app.locale", "id-ID"))
        .await
        .unwrap();
    let err = fx
        .db
        .settings()
        .create(CreateSettings::new("app.locale", "en-US"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "got {err:?}");
}

// =============================================================================
// Foreign keys
// =============================================================================

#[tokio::test]
async fn transaction_item_references_are_enforced() {
    let fx = fixture().await;
    let sale = pending_sale(&fx, 144_000).await;
    let beras = &fx.products[0];

    let err = fx
        .db
        .transaction_items()
        .create(CreateTransactionItem::new("missing-transaction", &beras.id, 1, 72_000))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "got {err:?}");

    let err = fx
        .db
        .transaction_items()
        .create(CreateTransactionItem::new(&sale.id, "missing-product", 1, 72_000))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "got {err:?}");

    fx.db
        .transaction_items()
        .create(CreateTransactionItem::new(&sale.id, &beras.id, 2, 72_000))
        .await
        .unwrap();

    // Product still referenced by a sale line.
    let err = fx
        .db
        .products()
        .delete(&ProductWhereUnique::Id(beras.id.clone()))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "got {err:?}");

    // Deleting the sale takes its lines with it, which frees the product.
    fx.db
        .transactions()
        .delete(&TransactionWhereUnique::Id(sale.id.clone()))
        .await
        .unwrap();
    let lines = FindArgs::<TransactionItem>::new()
        .filter(Filter::equals(TransactionItemField::TransactionId, &sale.id));
    assert_eq!(fx.db.transaction_items().count(&lines).await.unwrap(), 0);

    fx.db
        .products()
        .delete(&ProductWhereUnique::Id(beras.id.clone()))
        .await
        .unwrap();
}

// =============================================================================
// Round trip, counts and defaults
// =============================================================================

#[tokio::test]
async fn created_rows_read_back_unchanged() {
    let fx = fixture().await;

    for product in &fx.products {
        let fetched = fx.db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(&fetched, product);
    }

    let fetched = fx.db.users().get_by_id(&fx.cashier.id).await.unwrap();
    assert_eq!(fetched.username, "kasir1");
    assert_eq!(fetched.role, Some(Role::Kasir));
    assert_eq!(fetched.default_store_id, None);
}

#[tokio::test]
async fn count_matches_find_many() {
    let fx = fixture().await;

    let filters = [
        None,
        Some(Filter::field(ProductField::Stock, Condition::Gt(0i64.into()))),
        Some(Filter::field(ProductField::Name, Condition::Contains("a".into()))),
        Some(Filter::field(ProductField::Price, Condition::Gte(1_000_000i64.into()))),
    ];

    for filter in filters {
        let mut args = FindArgs::<Product>::new();
        if let Some(filter) = filter {
            args = args.filter(filter);
        }
        let rows = fx.db.products().find_many(&args).await.unwrap();
        let count = fx.db.products().count(&args).await.unwrap();
        assert_eq!(count, rows.len() as i64, "args: {args:?}");
    }
}

#[tokio::test]
async fn store_defaults_are_applied() {
    let fx = fixture().await;

    assert_eq!(fx.store.tax_rate, 0.0);
    assert_eq!(fx.store.currency, DEFAULT_CURRENCY);
    assert_eq!(fx.store.currency, "IDR");
    assert!(fx.store.is_active);

    let active = FindArgs::<Store>::new().filter(Filter::equals(StoreField::IsActive, true));
    assert_eq!(fx.db.stores().count(&active).await.unwrap(), 1);
}

// =============================================================================
// Transaction status
// =============================================================================

#[tokio::test]
async fn status_defaults_to_pending_and_update_is_visible() {
    let fx = fixture().await;
    let sale = pending_sale(&fx, 36_000).await;
    assert_eq!(sale.status, TransactionStatus::Pending);
    assert_eq!(sale.amount_paid, 0);

    let unique = TransactionWhereUnique::Id(sale.id.clone());
    let update = UpdateTransaction {
        amount_paid: Some(NumberUpdate::Set(50_000)),
        change_amount: Some(NumberUpdate::Set(14_000)),
        status: Some(TransactionStatus::Completed),
        ..Default::default()
    };
    fx.db.transactions().update(&unique, &update).await.unwrap();

    let fetched = fx.db.transactions().get_by_id(&sale.id).await.unwrap();
    assert_eq!(fetched.status, TransactionStatus::Completed);
    assert_eq!(fetched.change_amount, 14_000);

    let completed = FindArgs::<Transaction>::new().filter(Filter::equals(
        TransactionField::Status,
        TransactionStatus::Completed.as_str(),
    ));
    assert_eq!(fx.db.transactions().count(&completed).await.unwrap(), 1);
}

#[tokio::test]
async fn completed_change_follows_stored_amounts() {
    let fx = fixture().await;
    let sale = pending_sale(&fx, 36_000).await;
    let unique = TransactionWhereUnique::Id(sale.id.clone());
    let transactions = fx.db.transactions();

    let paid = UpdateTransaction {
        amount_paid: Some(NumberUpdate::Set(50_000)),
        ..Default::default()
    };
    let row = transactions.update(&unique, &paid).await.unwrap();
    assert_eq!(row.change_amount, 0, "pending rows carry no change");

    let status_only = UpdateTransaction {
        status: Some(TransactionStatus::Completed),
        ..Default::default()
    };
    let row = transactions.update(&unique, &status_only).await.unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
    assert_eq!(row.change_amount, 14_000);

    let discount = UpdateTransaction {
        total_amount: Some(NumberUpdate::Decrement(1_000)),
        ..Default::default()
    };
    let row = transactions.update(&unique, &discount).await.unwrap();
    assert_eq!(row.change_amount, 15_000);

    let wrong_change = UpdateTransaction {
        change_amount: Some(NumberUpdate::Set(1)),
        ..Default::default()
    };
    let err = transactions.update(&unique, &wrong_change).await.unwrap_err();
    assert!(err.is_validation(), "got {err:?}");
    assert_eq!(transactions.get_by_id(&sale.id).await.unwrap().change_amount, 15_000);

    // Completing an unpaid sale by plain update: no change is due.
    let unpaid = pending_sale(&fx, 2_000).await;
    let row = transactions
        .update(&TransactionWhereUnique::Id(unpaid.id.clone()), &status_only)
        .await
        .unwrap();
    assert_eq!((row.status, row.amount_paid, row.change_amount), (TransactionStatus::Completed, 0, 0));
}

// =============================================================================
// Line subtotals
// =============================================================================

#[tokio::test]
async fn item_subtotal_follows_partial_updates() {
    let fx = fixture().await;
    let sale = pending_sale(&fx, 2_000).await;
    let items = fx.db.transaction_items();

    let item = items
        .create(CreateTransactionItem::new(&sale.id, &fx.products[0].id, 2, 1_000))
        .await
        .unwrap();
    assert_eq!(item.subtotal, 2_000);
    let unique = TransactionItemWhereUnique::Id(item.id.clone());

    let quantity_only = UpdateTransactionItem {
        quantity: Some(NumberUpdate::Set(5)),
        ..Default::default()
    };
    let row = items.update(&unique, &quantity_only).await.unwrap();
    assert_eq!((row.quantity, row.price, row.subtotal), (5, 1_000, 5_000));

    let price_up = UpdateTransactionItem {
        price: Some(NumberUpdate::Increment(500)),
        ..Default::default()
    };
    let row = items.update(&unique, &price_up).await.unwrap();
    assert_eq!((row.quantity, row.price, row.subtotal), (5, 1_500, 7_500));

    let stale_subtotal = UpdateTransactionItem {
        quantity: Some(NumberUpdate::Set(1)),
        subtotal: Some(NumberUpdate::Set(999)),
        ..Default::default()
    };
    let err = items.update(&unique, &stale_subtotal).await.unwrap_err();
    assert!(err.is_validation(), "got {err:?}");
    let row = items.get_by_id(&item.id).await.unwrap();
    assert_eq!((row.quantity, row.subtotal), (5, 7_500), "rejected update is rolled back");

    let one_more = UpdateTransactionItem {
        quantity: Some(NumberUpdate::Increment(1)),
        ..Default::default()
    };
    let lines = Filter::equals(TransactionItemField::TransactionId, &sale.id);
    let batch = items.update_many(Some(&lines), &one_more).await.unwrap();
    assert_eq!(batch.count, 1);
    assert_eq!(items.get_by_id(&item.id).await.unwrap().subtotal, 9_000);
}

// =============================================================================
// groupBy argument rules
// =============================================================================

#[tokio::test]
async fn group_by_rejects_fields_outside_by_before_sql() {
    // No migration: any SQL reaching SQLite would fail with "no such table".
    let db = Database::new(DbConfig::in_memory().run_migrations(false))
        .await
        .unwrap();

    let order_outside = GroupByArgs::new([TransactionField::Status])
        .order_by(GroupOrderBy::field(TransactionField::TotalAmount, SortOrder::Desc));
    let err = db.transactions().group_by(&order_outside).await.unwrap_err();
    match err {
        DbError::Validation(ValidationError::FieldNotInBy { field, clause }) => {
            assert_eq!(field, "totalAmount");
            assert_eq!(clause, "orderBy");
        }
        other => panic!("expected FieldNotInBy, got {other:?}"),
    }

    let having_outside = GroupByArgs::new([TransactionField::Status]).having(Having::field(
        TransactionField::PaymentMethod,
        Condition::Equals("CASH".into()),
    ));
    let err = db.transactions().group_by(&having_outside).await.unwrap_err();
    assert!(
        matches!(err, DbError::Validation(ValidationError::FieldNotInBy { .. })),
        "got {err:?}"
    );

    // Aggregates over fields outside `by` are allowed in having.
    let fx = fixture().await;
    pending_sale(&fx, 10_000).await;
    pending_sale(&fx, 20_000).await;
    let args = GroupByArgs::new([TransactionField::Status])
        .select(AggregateSelect::new().count(CountSelect::all()))
        .having(Having::aggregate(
            AggregateFn::Sum,
            TransactionField::TotalAmount,
            Condition::Gte(30_000i64.into()),
        ));
    let rows = fx.db.transactions().group_by(&args).await.unwrap();
    assert_eq!(rows.len(), 1);
}
