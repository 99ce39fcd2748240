//! # User Repository
//!
//! Users, their store memberships and the transactions they rang up.
//!
//! ## Membership Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   User ──1:n── UserStore ──n:1── Store                                  │
//! │     │          (role per store,                                         │
//! │     │           unique per (userId, storeId))                           │
//! │     │                                                                   │
//! │     ├── defaultStoreId ──► Store    (nullable, SET NULL on delete)      │
//! │     └── transactions as cashier     (Transaction.cashierUserId)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use kasir_core::query::Filter;
use kasir_core::{Store, StoreField, Transaction, TransactionField, User, UserStore, UserStoreField};

use super::Repository;
use crate::crud::{self, Args};
use crate::error::DbResult;
use crate::relations::{children, children_by_parent, count_children, ids, optional_parent, parent};

/// Relation cardinalities of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCount {
    pub memberships: i64,
    pub transactions: i64,
}

/// A user together with their store memberships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithMemberships {
    #[serde(flatten)]
    pub user: User,
    pub memberships: Vec<UserStore>,
}

impl Repository<'_, User> {
    pub async fn memberships(&self, user_id: &str, args: &Args<UserStore>) -> DbResult<Vec<UserStore>> {
        let mut conn = self.conn().await?;
        children(&mut conn, UserStoreField::UserId, user_id, args).await
    }

    /// Transactions rung up by this user as cashier.
    pub async fn transactions(
        &self,
        user_id: &str,
        args: &Args<Transaction>,
    ) -> DbResult<Vec<Transaction>> {
        let mut conn = self.conn().await?;
        children(&mut conn, TransactionField::CashierUserId, user_id, args).await
    }

    pub async fn default_store(&self, user: &User) -> DbResult<Option<Store>> {
        let mut conn = self.conn().await?;
        optional_parent(&mut conn, user.default_store_id.as_deref()).await
    }

    /// Stores the user is a member of, ordered by `args`.
    pub async fn stores(&self, user_id: &str, args: &Args<Store>) -> DbResult<Vec<Store>> {
        let mut conn = self.conn().await?;
        let memberships =
            children::<UserStore>(&mut conn, UserStoreField::UserId, user_id, &Args::<UserStore>::new()).await?;
        let store_ids = memberships.into_iter().map(|m| m.store_id);
        let scoped = args.clone().and_where(Filter::is_in(StoreField::Id, store_ids));
        crud::find_many::<Store>(&mut conn, &scoped).await
    }

    pub async fn counts(&self, user_id: &str) -> DbResult<UserCount> {
        let mut conn = self.conn().await?;
        Ok(UserCount {
            memberships: count_children::<UserStore>(&mut conn, UserStoreField::UserId, user_id).await?,
            transactions: count_children::<Transaction>(&mut conn, TransactionField::CashierUserId, user_id)
                .await?,
        })
    }

    /// A page of users with their memberships, two queries in total.
    pub async fn with_memberships(
        &self,
        args: &Args<User>,
        memberships: &Args<UserStore>,
    ) -> DbResult<Vec<UserWithMemberships>> {
        let mut conn = self.conn().await?;
        let users = crud::find_many::<User>(&mut conn, args).await?;
        let mut by_user =
            children_by_parent::<UserStore>(&mut conn, UserStoreField::UserId, &ids(&users), memberships).await?;

        debug!(users = users.len(), "Loaded users with memberships");
        Ok(users
            .into_iter()
            .map(|user| UserWithMemberships {
                memberships: by_user.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect())
    }
}

impl Repository<'_, UserStore> {
    pub async fn user(&self, membership: &UserStore) -> DbResult<User> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &membership.user_id).await
    }

    pub async fn store(&self, membership: &UserStore) -> DbResult<Store> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &membership.store_id).await
    }
}
