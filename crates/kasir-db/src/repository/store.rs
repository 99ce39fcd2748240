//! # Store Repository
//!
//! Relations hanging off a store.
//!
//! ```text
//! Store ──┬── products        (Product.storeId)
//!         ├── categories      (Category.storeId)
//!         ├── transactions    (Transaction.storeId)
//!         ├── memberships     (UserStore.storeId)
//!         ├── store_settings  (StoreSettings.storeId)
//!         └── default_users   (User.defaultStoreId)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use kasir_core::{
    Category, CategoryField, Product, ProductField, Store, StoreSettings, StoreSettingsField,
    Transaction, TransactionField, User, UserField, UserStore, UserStoreField,
};

use super::Repository;
use crate::crud::Args;
use crate::error::DbResult;
use crate::relations::{children, count_children};

/// Relation cardinalities of one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCount {
    pub products: i64,
    pub categories: i64,
    pub transactions: i64,
    pub memberships: i64,
    pub store_settings: i64,
    pub default_users: i64,
}

impl Repository<'_, Store> {
    /// Products of a store, narrowed and paged by `args`.
    pub async fn products(&self, store_id: &str, args: &Args<Product>) -> DbResult<Vec<Product>> {
        let mut conn = self.conn().await?;
        children(&mut conn, ProductField::StoreId, store_id, args).await
    }

    pub async fn categories(&self, store_id: &str, args: &Args<Category>) -> DbResult<Vec<Category>> {
        let mut conn = self.conn().await?;
        children(&mut conn, CategoryField::StoreId, store_id, args).await
    }

    pub async fn transactions(
        &self,
        store_id: &str,
        args: &Args<Transaction>,
    ) -> DbResult<Vec<Transaction>> {
        let mut conn = self.conn().await?;
        children(&mut conn, TransactionField::StoreId, store_id, args).await
    }

    /// User memberships of a store.
    pub async fn memberships(&self, store_id: &str, args: &Args<UserStore>) -> DbResult<Vec<UserStore>> {
        let mut conn = self.conn().await?;
        children(&mut conn, UserStoreField::StoreId, store_id, args).await
    }

    pub async fn store_settings(
        &self,
        store_id: &str,
        args: &Args<StoreSettings>,
    ) -> DbResult<Vec<StoreSettings>> {
        let mut conn = self.conn().await?;
        children(&mut conn, StoreSettingsField::StoreId, store_id, args).await
    }

    /// Users whose default store is this one.
    pub async fn default_users(&self, store_id: &str, args: &Args<User>) -> DbResult<Vec<User>> {
        let mut conn = self.conn().await?;
        children(&mut conn, UserField::DefaultStoreId, store_id, args).await
    }

    /// Counts every relation of a store without loading rows.
    pub async fn counts(&self, store_id: &str) -> DbResult<StoreCount> {
        let mut conn = self.conn().await?;
        let counts = StoreCount {
            products: count_children::<Product>(&mut conn, ProductField::StoreId, store_id).await?,
            categories: count_children::<Category>(&mut conn, CategoryField::StoreId, store_id).await?,
            transactions: count_children::<Transaction>(&mut conn, TransactionField::StoreId, store_id)
                .await?,
            memberships: count_children::<UserStore>(&mut conn, UserStoreField::StoreId, store_id).await?,
            store_settings: count_children::<StoreSettings>(
                &mut conn,
                StoreSettingsField::StoreId,
                store_id,
            )
            .await?,
            default_users: count_children::<User>(&mut conn, UserField::DefaultStoreId, store_id).await?,
        };
        debug!(store_id, ?counts, "Store relation counts");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::catalog_fixture;
    use kasir_core::query::{FindArgs, OrderBy};
    use kasir_core::{CreateStore, CreateStoreSettings, CreateUser, CreateUserStore, Role, UpdateUser, UserWhereUnique};

    #[tokio::test]
    async fn test_store_relations_and_counts() {
        let (db, store, _, _) = catalog_fixture(&[100, 200, 300]).await;
        let other = db.stores().create(CreateStore::new("Toko Lain")).await.unwrap();

        let user = db
            .users()
            .create(CreateUser::new("Budi", "budi", "hash"))
            .await
            .unwrap();
        db.user_stores()
            .create(CreateUserStore::new(&user.id, &store.id, Role::Kasir))
            .await
            .unwrap();
        db.store_settings()
            .create(CreateStoreSettings::new(&store.id, "receipt_footer", "Terima kasih"))
            .await
            .unwrap();
        let set_default = UpdateUser {
            default_store_id: Some(Some(store.id.clone())),
            ..Default::default()
        };
        db.users()
            .update(&UserWhereUnique::Id(user.id.clone()), &set_default)
            .await
            .unwrap();

        let products = db
            .stores()
            .products(&store.id, &FindArgs::<Product>::new().order_by(OrderBy::desc(ProductField::Price)).take(2))
            .await
            .unwrap();
        assert_eq!(products.iter().map(|p| p.price).collect::<Vec<_>>(), vec![300, 200]);

        let counts = db.stores().counts(&store.id).await.unwrap();
        assert_eq!(
            counts,
            StoreCount {
                products: 3,
                categories: 1,
                transactions: 0,
                memberships: 1,
                store_settings: 1,
                default_users: 1,
            }
        );
        assert_eq!(db.stores().counts(&other.id).await.unwrap(), StoreCount::default());

        let defaults = db.stores().default_users(&store.id, &FindArgs::<User>::new()).await.unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].username, "budi");
    }

    #[test]
    fn test_count_serializes_camel_case() {
        let json = serde_json::to_value(StoreCount::default()).unwrap();
        assert!(json.get("storeSettings").is_some());
        assert!(json.get("defaultUsers").is_some());
    }
}
