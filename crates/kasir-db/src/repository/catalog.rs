//! # Catalog Repository
//!
//! Categories, products and stock movements.
//!
//! ## Stock Adjustments
//! ```text
//! adjust_stock(id, +5)  →  UPDATE products SET stock = stock + 5 …
//! adjust_stock(id, -3)  →  UPDATE products SET stock = stock - 3 …
//!                          stock < 0 is rejected by CHECK (stock >= 0)
//!                          → DbError::CheckViolation, row unchanged
//! ```
//!
//! Adjustments are relative to the stored count, never absolute writes.
//!
//! A product lives in its category's store. Creating or moving either side
//! across stores fails with `DbError::CheckViolation`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use kasir_core::query::NumberUpdate;
use kasir_core::{
    Category, Product, ProductField, ProductWhereUnique, Store, TransactionItem,
    TransactionItemField, UpdateProduct,
};

use super::Repository;
use crate::crud::{self, Args};
use crate::error::DbResult;
use crate::relations::{children, children_by_parent, count_children, ids, parent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub products: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCount {
    pub transaction_items: i64,
}

/// A category together with its products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

// =============================================================================
// Category
// =============================================================================

impl Repository<'_, Category> {
    pub async fn store(&self, category: &Category) -> DbResult<Store> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &category.store_id).await
    }

    pub async fn products(&self, category_id: &str, args: &Args<Product>) -> DbResult<Vec<Product>> {
        let mut conn = self.conn().await?;
        children(&mut conn, ProductField::CategoryId, category_id, args).await
    }

    pub async fn counts(&self, category_id: &str) -> DbResult<CategoryCount> {
        let mut conn = self.conn().await?;
        Ok(CategoryCount {
            products: count_children::<Product>(&mut conn, ProductField::CategoryId, category_id).await?,
        })
    }

    /// A page of categories with their products, two queries in total.
    ///
    /// `products.skip` / `products.take` page the products of each category.
    pub async fn with_products(
        &self,
        args: &Args<Category>,
        products: &Args<Product>,
    ) -> DbResult<Vec<CategoryWithProducts>> {
        let mut conn = self.conn().await?;
        let categories = crud::find_many::<Category>(&mut conn, args).await?;
        let mut by_category =
            children_by_parent::<Product>(&mut conn, ProductField::CategoryId, &ids(&categories), products)
                .await?;

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithProducts {
                products: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}

// =============================================================================
// Product
// =============================================================================

impl Repository<'_, Product> {
    pub async fn category(&self, product: &Product) -> DbResult<Category> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &product.category_id).await
    }

    pub async fn store(&self, product: &Product) -> DbResult<Store> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &product.store_id).await
    }

    /// Sale lines that sold this product.
    pub async fn transaction_items(
        &self,
        product_id: &str,
        args: &Args<TransactionItem>,
    ) -> DbResult<Vec<TransactionItem>> {
        let mut conn = self.conn().await?;
        children(&mut conn, TransactionItemField::ProductId, product_id, args).await
    }

    pub async fn counts(&self, product_id: &str) -> DbResult<ProductCount> {
        let mut conn = self.conn().await?;
        Ok(ProductCount {
            transaction_items: count_children::<TransactionItem>(
                &mut conn,
                TransactionItemField::ProductId,
                product_id,
            )
            .await?,
        })
    }

    /// Moves stock by `delta` units and returns the updated product.
    ///
    /// ## Errors
    /// - `NotFound` when the product does not exist
    /// - `CheckViolation` when the result would be negative
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<Product> {
        let stock = if delta >= 0 {
            NumberUpdate::Increment(delta)
        } else {
            NumberUpdate::Decrement(delta.checked_neg().unwrap_or(i64::MAX))
        };
        let update = UpdateProduct {
            stock: Some(stock),
            ..Default::default()
        };

        let mut conn = self.conn().await?;
        let product =
            crud::update::<Product>(&mut conn, &ProductWhereUnique::Id(product_id.to_string()), &update).await?;
        debug!(product_id, delta, stock = product.stock, "Stock adjusted");
        Ok(product)
    }
}
