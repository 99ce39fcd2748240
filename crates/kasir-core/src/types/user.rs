//! Users and their store memberships.
//!
//! ```text
//! User ──< UserStore >── Store
//!   │        (role per store, UNIQUE(userId, storeId))
//!   └── defaultStoreId ──► Store   (ON DELETE SET NULL)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::enums::Role;
use crate::entity::{push_opt, CreateInput, Entity, UniqueWhere, UpdateInput};
use crate::query::filter::Filter;
use crate::query::update::{push_nullable, push_set, Assignment};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::{
    validate_id, validate_name, validate_password_hash, validate_username, ValidationResult,
};

// =============================================================================
// User
// =============================================================================

/// A person who can log in to one or more stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Login name, unique across all stores.
    pub username: String,
    /// Password hash. Never plaintext.
    pub password: String,
    /// Global role. Per-store roles live on [`UserStore`].
    pub role: Option<Role>,
    pub default_store_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserField {
    Id,
    Name,
    Username,
    Password,
    Role,
    DefaultStoreId,
    CreatedAt,
    UpdatedAt,
}

impl Field for UserField {
    fn column(self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Name => "name",
            UserField::Username => "username",
            UserField::Password => "password",
            UserField::Role => "role",
            UserField::DefaultStoreId => "default_store_id",
            UserField::CreatedAt => "created_at",
            UserField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Name => "name",
            UserField::Username => "username",
            UserField::Password => "password",
            UserField::Role => "role",
            UserField::DefaultStoreId => "defaultStoreId",
            UserField::CreatedAt => "createdAt",
            UserField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            UserField::Role => FieldKind::Enum(Role::VALUES),
            UserField::CreatedAt | UserField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, UserField::Role | UserField::DefaultStoreId)
    }

    fn all() -> &'static [Self] {
        &[
            UserField::Id,
            UserField::Name,
            UserField::Username,
            UserField::Password,
            UserField::Role,
            UserField::DefaultStoreId,
            UserField::CreatedAt,
            UserField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserWhereUnique {
    Id(String),
    Username(String),
}

impl UniqueWhere<UserField> for UserWhereUnique {
    fn to_filter(&self) -> Filter<UserField> {
        match self {
            UserWhereUnique::Id(id) => Filter::equals(UserField::Id, id),
            UserWhereUnique::Username(username) => Filter::equals(UserField::Username, username),
        }
    }

    fn describe(&self) -> String {
        match self {
            UserWhereUnique::Id(id) => format!("id={id}"),
            UserWhereUnique::Username(username) => format!("username={username}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUser {
    pub id: Option<String>,
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Option<Role>,
    pub default_store_id: Option<String>,
}

impl CreateUser {
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        CreateUser {
            name: name.into(),
            username: username.into(),
            password: password_hash.into(),
            ..Default::default()
        }
    }
}

impl CreateInput<UserField> for CreateUser {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_username(&self.username)?;
        validate_password_hash(&self.password)?;
        if let Some(store_id) = &self.default_store_id {
            validate_id("defaultStoreId", store_id)?;
        }
        Ok(())
    }

    fn into_values(self) -> Vec<(UserField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, UserField::Id, self.id);
        out.push((UserField::Name, self.name.into()));
        out.push((UserField::Username, self.username.into()));
        out.push((UserField::Password, self.password.into()));
        push_opt(&mut out, UserField::Role, self.role);
        push_opt(&mut out, UserField::DefaultStoreId, self.default_store_id);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub role: Option<Option<Role>>,
    #[serde(deserialize_with = "super::double_option")]
    pub default_store_id: Option<Option<String>>,
}

impl UpdateInput<UserField> for UpdateUser {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(password) = &self.password {
            validate_password_hash(password)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<UserField>> {
        let mut out = Vec::new();
        push_set(&mut out, UserField::Name, &self.name);
        push_set(&mut out, UserField::Username, &self.username);
        push_set(&mut out, UserField::Password, &self.password);
        push_nullable(&mut out, UserField::Role, &self.role);
        push_nullable(&mut out, UserField::DefaultStoreId, &self.default_store_id);
        out
    }
}

impl Entity for User {
    type Field = UserField;
    type Unique = UserWhereUnique;
    type Create = CreateUser;
    type Update = UpdateUser;

    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const ID: UserField = UserField::Id;
    const CREATED_AT: UserField = UserField::CreatedAt;
    const UPDATED_AT: UserField = UserField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: UserField) -> Value {
        match field {
            UserField::Id => self.id.as_str().into(),
            UserField::Name => self.name.as_str().into(),
            UserField::Username => self.username.as_str().into(),
            UserField::Password => self.password.as_str().into(),
            UserField::Role => self.role.into(),
            UserField::DefaultStoreId => self.default_store_id.clone().into(),
            UserField::CreatedAt => self.created_at.into(),
            UserField::UpdatedAt => self.updated_at.into(),
        }
    }
}

// =============================================================================
// UserStore
// =============================================================================

/// Membership of a user in a store, with the role held there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStore {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserStoreField {
    Id,
    UserId,
    StoreId,
    Role,
    CreatedAt,
    UpdatedAt,
}

impl Field for UserStoreField {
    fn column(self) -> &'static str {
        match self {
            UserStoreField::Id => "id",
            UserStoreField::UserId => "user_id",
            UserStoreField::StoreId => "store_id",
            UserStoreField::Role => "role",
            UserStoreField::CreatedAt => "created_at",
            UserStoreField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            UserStoreField::Id => "id",
            UserStoreField::UserId => "userId",
            UserStoreField::StoreId => "storeId",
            UserStoreField::Role => "role",
            UserStoreField::CreatedAt => "createdAt",
            UserStoreField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            UserStoreField::Role => FieldKind::Enum(Role::VALUES),
            UserStoreField::CreatedAt | UserStoreField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn all() -> &'static [Self] {
        &[
            UserStoreField::Id,
            UserStoreField::UserId,
            UserStoreField::StoreId,
            UserStoreField::Role,
            UserStoreField::CreatedAt,
            UserStoreField::UpdatedAt,
        ]
    }
}

/// Primary key, or the compound `(userId, storeId)` unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserStoreWhereUnique {
    Id(String),
    #[serde(rename_all = "camelCase")]
    UserIdStoreId {
        user_id: String,
        store_id: String,
    },
}

impl UniqueWhere<UserStoreField> for UserStoreWhereUnique {
    fn to_filter(&self) -> Filter<UserStoreField> {
        match self {
            UserStoreWhereUnique::Id(id) => Filter::equals(UserStoreField::Id, id),
            UserStoreWhereUnique::UserIdStoreId { user_id, store_id } => Filter::and([
                Filter::equals(UserStoreField::UserId, user_id),
                Filter::equals(UserStoreField::StoreId, store_id),
            ]),
        }
    }

    fn describe(&self) -> String {
        match self {
            UserStoreWhereUnique::Id(id) => format!("id={id}"),
            UserStoreWhereUnique::UserIdStoreId { user_id, store_id } => {
                format!("userId={user_id}, storeId={store_id}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserStore {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub store_id: String,
    pub role: Role,
}

impl CreateUserStore {
    pub fn new(user_id: impl Into<String>, store_id: impl Into<String>, role: Role) -> Self {
        CreateUserStore {
            id: None,
            user_id: user_id.into(),
            store_id: store_id.into(),
            role,
        }
    }
}

impl CreateInput<UserStoreField> for CreateUserStore {
    fn validate(&self) -> ValidationResult<()> {
        validate_id("userId", &self.user_id)?;
        validate_id("storeId", &self.store_id)
    }

    fn into_values(self) -> Vec<(UserStoreField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, UserStoreField::Id, self.id);
        out.push((UserStoreField::UserId, self.user_id.into()));
        out.push((UserStoreField::StoreId, self.store_id.into()));
        out.push((UserStoreField::Role, self.role.into()));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserStore {
    pub user_id: Option<String>,
    pub store_id: Option<String>,
    pub role: Option<Role>,
}

impl UpdateInput<UserStoreField> for UpdateUserStore {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(user_id) = &self.user_id {
            validate_id("userId", user_id)?;
        }
        if let Some(store_id) = &self.store_id {
            validate_id("storeId", store_id)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<UserStoreField>> {
        let mut out = Vec::new();
        push_set(&mut out, UserStoreField::UserId, &self.user_id);
        push_set(&mut out, UserStoreField::StoreId, &self.store_id);
        push_set(&mut out, UserStoreField::Role, &self.role);
        out
    }
}

impl Entity for UserStore {
    type Field = UserStoreField;
    type Unique = UserStoreWhereUnique;
    type Create = CreateUserStore;
    type Update = UpdateUserStore;

    const NAME: &'static str = "UserStore";
    const TABLE: &'static str = "user_stores";
    const ID: UserStoreField = UserStoreField::Id;
    const CREATED_AT: UserStoreField = UserStoreField::CreatedAt;
    const UPDATED_AT: UserStoreField = UserStoreField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: UserStoreField) -> Value {
        match field {
            UserStoreField::Id => self.id.as_str().into(),
            UserStoreField::UserId => self.user_id.as_str().into(),
            UserStoreField::StoreId => self.store_id.as_str().into(),
            UserStoreField::Role => self.role.into(),
            UserStoreField::CreatedAt => self.created_at.into(),
            UserStoreField::UpdatedAt => self.updated_at.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_unique_filter() {
        let unique = UserStoreWhereUnique::UserIdStoreId {
            user_id: "u1".into(),
            store_id: "s1".into(),
        };
        let fields = unique.to_filter().fields();
        assert_eq!(fields, vec![UserStoreField::UserId, UserStoreField::StoreId]);
        assert_eq!(unique.describe(), "userId=u1, storeId=s1");
    }

    #[test]
    fn test_compound_unique_json_shape() {
        let unique: UserStoreWhereUnique =
            serde_json::from_str(r#"{"userIdStoreId":{"userId":"u1","storeId":"s1"}}"#).unwrap();
        assert!(matches!(unique, UserStoreWhereUnique::UserIdStoreId { .. }));
    }

    #[test]
    fn test_create_user_validation() {
        assert!(CreateUser::new("Budi", "budi", "$argon2id$hash").validate().is_ok());
        assert!(CreateUser::new("Budi", "b", "$argon2id$hash").validate().is_err());
        assert!(CreateUser::new("Budi", "budi", "").validate().is_err());
    }

    #[test]
    fn test_role_field_is_enum() {
        let kind = UserField::Role.kind();
        assert!(kind.check("role", &Value::from("KASIR")).is_ok());
        assert!(kind.check("role", &Value::from("MANAGER")).is_err());
        assert!(UserField::Role.check_value(&Value::Null).is_ok());
        assert!(UserStoreField::Role.check_value(&Value::Null).is_err());
    }
}
