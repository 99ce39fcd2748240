//! # Transaction Repository
//!
//! Sales (`transactions`) and their lines (`transaction_items`).
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Transaction Lifecycle                             │
//! │                                                                         │
//! │  1. CREATE                                                              │
//! │     └── create_with_items() → Transaction { status: PENDING } + items   │
//! │         (one SQL transaction; totalAmount = Σ price × quantity)         │
//! │                                                                         │
//! │  2. PAY                                                                 │
//! │     └── complete(id, amount_paid) → Transaction { status: COMPLETED }   │
//! │         changeAmount = amountPaid - totalAmount, underpayment rejected  │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                   │
//! │     └── cancel(id) → Transaction { status: CANCELLED }                  │
//! │                                                                         │
//! │  Only PENDING transactions move; anything else is                       │
//! │  CoreError::InvalidTransactionStatus.                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::Connection;
use tracing::{debug, info};

use kasir_core::{
    CoreResult, CreateTransactionWithItems, Product, Store, Transaction, TransactionItem,
    TransactionItemField, TransactionWhereUnique, UpdateTransaction, User,
};

use super::Repository;
use crate::crud::{self, Args};
use crate::error::{DbError, DbResult};
use crate::relations::{children, children_by_parent, count_children, ids, parent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCount {
    pub items: i64,
}

/// A transaction together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWithItems {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Transaction
// =============================================================================

impl Repository<'_, Transaction> {
    /// The user who rang up the transaction.
    pub async fn cashier(&self, transaction: &Transaction) -> DbResult<User> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &transaction.cashier_user_id).await
    }

    pub async fn store(&self, transaction: &Transaction) -> DbResult<Store> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &transaction.store_id).await
    }

    pub async fn items(
        &self,
        transaction_id: &str,
        args: &Args<TransactionItem>,
    ) -> DbResult<Vec<TransactionItem>> {
        let mut conn = self.conn().await?;
        children(&mut conn, TransactionItemField::TransactionId, transaction_id, args).await
    }

    pub async fn counts(&self, transaction_id: &str) -> DbResult<TransactionCount> {
        let mut conn = self.conn().await?;
        Ok(TransactionCount {
            items: count_children::<TransactionItem>(
                &mut conn,
                TransactionItemField::TransactionId,
                transaction_id,
            )
            .await?,
        })
    }

    /// A page of transactions with their items, two queries in total.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let today = db.transactions().with_items(
    ///     &FindArgs::<Transaction>::new()
    ///         .filter(Filter::field(TransactionField::CreatedAt, Condition::Gte(midnight.into())))
    ///         .order_by(OrderBy::desc(TransactionField::CreatedAt)),
    ///     &FindArgs::<TransactionItem>::new(),
    /// ).await?;
    /// ```
    pub async fn with_items(
        &self,
        args: &Args<Transaction>,
        items: &Args<TransactionItem>,
    ) -> DbResult<Vec<TransactionWithItems>> {
        let mut conn = self.conn().await?;
        let transactions = crud::find_many::<Transaction>(&mut conn, args).await?;
        let mut by_transaction = children_by_parent::<TransactionItem>(
            &mut conn,
            TransactionItemField::TransactionId,
            &ids(&transactions),
            items,
        )
        .await?;

        Ok(transactions
            .into_iter()
            .map(|transaction| TransactionWithItems {
                items: by_transaction.remove(&transaction.id).unwrap_or_default(),
                transaction,
            })
            .collect())
    }

    /// Creates a transaction and all of its lines atomically.
    ///
    /// ## What This Does
    /// 1. Validates the parent, every line, and that the total matches the lines
    /// 2. Inserts the parent
    /// 3. Inserts each line with its computed subtotal
    ///
    /// Any failure (including a foreign key on a line) leaves nothing behind.
    pub async fn create_with_items(&self, input: CreateTransactionWithItems) -> DbResult<TransactionWithItems> {
        input.validate()?;

        let mut conn = self.conn().await?;
        let mut tx = conn.begin().await?;

        let transaction = crud::create::<Transaction>(&mut *tx, input.transaction).await?;
        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = crud::create::<TransactionItem>(&mut *tx, line.for_transaction(&transaction.id)).await?;
            items.push(item);
        }
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            items = items.len(),
            total = transaction.total_amount,
            "Transaction created"
        );
        Ok(TransactionWithItems { transaction, items })
    }

    /// Completes a PENDING transaction with the amount tendered.
    ///
    /// ## Errors
    /// - `NotFound` when the transaction does not exist
    /// - `Domain(InvalidTransactionStatus)` unless PENDING
    /// - `Domain(InvalidPaymentAmount)` when `amount_paid` is below the total
    pub async fn complete(&self, transaction_id: &str, amount_paid: i64) -> DbResult<Transaction> {
        let completed = self
            .transition(transaction_id, |current| current.completion(amount_paid))
            .await?;
        info!(
            transaction_id,
            amount_paid,
            change = completed.change_amount,
            "Transaction completed"
        );
        Ok(completed)
    }

    /// Cancels a PENDING transaction.
    pub async fn cancel(&self, transaction_id: &str) -> DbResult<Transaction> {
        let cancelled = self.transition(transaction_id, Transaction::cancellation).await?;
        info!(transaction_id, "Transaction cancelled");
        Ok(cancelled)
    }

    /// Reads the current row and applies the update derived from it, both in
    /// one SQL transaction so the status check and the write cannot interleave.
    async fn transition(
        &self,
        transaction_id: &str,
        next: impl FnOnce(&Transaction) -> CoreResult<UpdateTransaction>,
    ) -> DbResult<Transaction> {
        let unique = TransactionWhereUnique::Id(transaction_id.to_string());

        let mut conn = self.conn().await?;
        let mut tx = conn.begin().await?;
        let current = crud::find_unique::<Transaction>(&mut *tx, &unique)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", format!("id={transaction_id}")))?;
        let update = next(&current)?;
        let updated = crud::update::<Transaction>(&mut *tx, &unique, &update).await?;
        tx.commit().await?;

        debug!(transaction_id, from = %current.status, to = %updated.status, "Status changed");
        Ok(updated)
    }
}

// =============================================================================
// TransactionItem
// =============================================================================

impl Repository<'_, TransactionItem> {
    pub async fn transaction(&self, item: &TransactionItem) -> DbResult<Transaction> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &item.transaction_id).await
    }

    pub async fn product(&self, item: &TransactionItem) -> DbResult<Product> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &item.product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::tests::catalog_fixture;
    use kasir_core::query::{FindArgs, OrderBy};
    use kasir_core::{
        CoreError, CreateTransaction, CreateUser, NewTransactionLine, PaymentMethod, ProductWhereUnique,
        TransactionField, TransactionStatus,
    };

    /// Store with products priced 5000 and 12000, plus a cashier.
    async fn sale_fixture() -> (Database, Vec<Product>, User) {
        let (db, _, _, products) = catalog_fixture(&[5_000, 12_000]).await;
        let cashier = db
            .users()
            .create(CreateUser::new("Kasir Satu", "kasir1", "hash"))
            .await
            .unwrap();
        (db, products, cashier)
    }

    fn sale(products: &[Product], cashier: &User, total: i64) -> CreateTransactionWithItems {
        CreateTransactionWithItems {
            transaction: CreateTransaction::new(total, PaymentMethod::Cash, &cashier.id, &products[0].store_id),
            items: vec![
                NewTransactionLine::new(&products[0].id, 2, products[0].price),
                NewTransactionLine::new(&products[1].id, 1, products[1].price),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_with_items() {
        let (db, products, cashier) = sale_fixture().await;

        let created = db
            .transactions()
            .create_with_items(sale(&products, &cashier, 22_000))
            .await
            .unwrap();
        assert_eq!(created.transaction.status, TransactionStatus::Pending);
        assert_eq!(created.transaction.amount_paid, 0);
        assert_eq!(created.items.len(), 2);
        assert_eq!(created.items[0].subtotal, 10_000);

        let id = &created.transaction.id;
        assert_eq!(db.transactions().counts(id).await.unwrap(), TransactionCount { items: 2 });
        assert_eq!(db.transactions().cashier(&created.transaction).await.unwrap().id, cashier.id);
        assert_eq!(db.transaction_items().product(&created.items[1]).await.unwrap().id, products[1].id);
        assert_eq!(db.transaction_items().transaction(&created.items[0]).await.unwrap().id, *id);
    }

    #[tokio::test]
    async fn test_create_with_items_rejects_total_mismatch() {
        let (db, products, cashier) = sale_fixture().await;

        let err = db
            .transactions()
            .create_with_items(sale(&products, &cashier, 20_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::TotalMismatch { .. })), "{err:?}");
    }

    #[tokio::test]
    async fn test_create_with_items_is_atomic() {
        let (db, products, cashier) = sale_fixture().await;
        let mut input = sale(&products, &cashier, 22_000);
        input.items[1].product_id = "no-such-product".into();

        let err = db.transactions().create_with_items(input).await.unwrap_err();
        assert!(err.is_foreign_key_violation(), "{err:?}");
        assert_eq!(db.transactions().count(&FindArgs::<Transaction>::new()).await.unwrap(), 0);
        assert_eq!(
            db.transaction_items().count(&FindArgs::<TransactionItem>::new()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_complete_and_cancel() {
        let (db, products, cashier) = sale_fixture().await;
        let first = db
            .transactions()
            .create_with_items(sale(&products, &cashier, 22_000))
            .await
            .unwrap()
            .transaction;

        let err = db.transactions().complete(&first.id, 20_000).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPaymentAmount { .. })), "{err:?}");

        let done = db.transactions().complete(&first.id, 25_000).await.unwrap();
        assert_eq!(done.status, TransactionStatus::Completed);
        assert_eq!(done.change_amount, 3_000);

        let err = db.transactions().cancel(&first.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransactionStatus { .. })));

        let second = db
            .transactions()
            .create_with_items(sale(&products, &cashier, 22_000))
            .await
            .unwrap()
            .transaction;
        let cancelled = db.transactions().cancel(&second.id).await.unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);

        assert!(db.transactions().cancel("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_with_items_and_delete_rules() {
        let (db, products, cashier) = sale_fixture().await;
        let created = db
            .transactions()
            .create_with_items(sale(&products, &cashier, 22_000))
            .await
            .unwrap();

        let pages = db
            .transactions()
            .with_items(
                &FindArgs::<Transaction>::new().order_by(OrderBy::desc(TransactionField::CreatedAt)),
                &FindArgs::<TransactionItem>::new().order_by(OrderBy::desc(TransactionItemField::Subtotal)),
            )
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].items[0].subtotal, 12_000);

        // Products referenced by a sale line cannot be deleted.
        let err = db
            .products()
            .delete(&ProductWhereUnique::Id(products[0].id.clone()))
            .await
            .unwrap_err();
        assert!(err.is_foreign_key_violation(), "{err:?}");

        // Deleting the sale takes its lines with it.
        db.transactions()
            .delete(&TransactionWhereUnique::Id(created.transaction.id.clone()))
            .await
            .unwrap();
        assert_eq!(
            db.transaction_items().count(&FindArgs::<TransactionItem>::new()).await.unwrap(),
            0
        );
    }
}
