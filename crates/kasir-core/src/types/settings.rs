//! Key/value settings: global ([`Settings`]) and per store ([`StoreSettings`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{push_opt, CreateInput, Entity, UniqueWhere, UpdateInput};
use crate::query::filter::Filter;
use crate::query::update::{push_nullable, push_set, Assignment};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::{validate_id, validate_name, validate_settings_key, ValidationResult};

// =============================================================================
// Settings (global)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settings {
    pub id: String,
    /// Unique across the installation.
    pub key: String,
    pub value: String,
    /// Grouping label. Defaults to [`DEFAULT_SETTINGS_CATEGORY`](crate::DEFAULT_SETTINGS_CATEGORY).
    pub category: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingsField {
    Id,
    Key,
    Value,
    Category,
    Description,
    CreatedAt,
    UpdatedAt,
}

impl Field for SettingsField {
    fn column(self) -> &'static str {
        match self {
            SettingsField::Id => "id",
            SettingsField::Key => "key",
            SettingsField::Value => "value",
            SettingsField::Category => "category",
            SettingsField::Description => "description",
            SettingsField::CreatedAt => "created_at",
            SettingsField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            SettingsField::Id => "id",
            SettingsField::Key => "key",
            SettingsField::Value => "value",
            SettingsField::Category => "category",
            SettingsField::Description => "description",
            SettingsField::CreatedAt => "createdAt",
            SettingsField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            SettingsField::CreatedAt | SettingsField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, SettingsField::Description)
    }

    fn all() -> &'static [Self] {
        &[
            SettingsField::Id,
            SettingsField::Key,
            SettingsField::Value,
            SettingsField::Category,
            SettingsField::Description,
            SettingsField::CreatedAt,
            SettingsField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingsWhereUnique {
    Id(String),
    Key(String),
}

impl UniqueWhere<SettingsField> for SettingsWhereUnique {
    fn to_filter(&self) -> Filter<SettingsField> {
        match self {
            SettingsWhereUnique::Id(id) => Filter::equals(SettingsField::Id, id),
            SettingsWhereUnique::Key(key) => Filter::equals(SettingsField::Key, key),
        }
    }

    fn describe(&self) -> String {
        match self {
            SettingsWhereUnique::Id(id) => format!("id={id}"),
            SettingsWhereUnique::Key(key) => format!("key={key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettings {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateSettings {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        CreateSettings {
            id: None,
            key: key.into(),
            value: value.into(),
            category: None,
            description: None,
        }
    }
}

impl CreateInput<SettingsField> for CreateSettings {
    fn validate(&self) -> ValidationResult<()> {
        validate_settings_key(&self.key)?;
        if let Some(category) = &self.category {
            validate_name("category", category)?;
        }
        Ok(())
    }

    fn into_values(self) -> Vec<(SettingsField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, SettingsField::Id, self.id);
        out.push((SettingsField::Key, self.key.into()));
        out.push((SettingsField::Value, self.value.into()));
        push_opt(&mut out, SettingsField::Category, self.category);
        push_opt(&mut out, SettingsField::Description, self.description);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSettings {
    pub key: Option<String>,
    pub value: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateSettings {
    /// Update that only replaces the value.
    pub fn value(value: impl Into<String>) -> Self {
        UpdateSettings {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl UpdateInput<SettingsField> for UpdateSettings {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(key) = &self.key {
            validate_settings_key(key)?;
        }
        if let Some(category) = &self.category {
            validate_name("category", category)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<SettingsField>> {
        let mut out = Vec::new();
        push_set(&mut out, SettingsField::Key, &self.key);
        push_set(&mut out, SettingsField::Value, &self.value);
        push_set(&mut out, SettingsField::Category, &self.category);
        push_nullable(&mut out, SettingsField::Description, &self.description);
        out
    }
}

impl Entity for Settings {
    type Field = SettingsField;
    type Unique = SettingsWhereUnique;
    type Create = CreateSettings;
    type Update = UpdateSettings;

    const NAME: &'static str = "Settings";
    const TABLE: &'static str = "settings";
    const ID: SettingsField = SettingsField::Id;
    const CREATED_AT: SettingsField = SettingsField::CreatedAt;
    const UPDATED_AT: SettingsField = SettingsField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: SettingsField) -> Value {
        match field {
            SettingsField::Id => self.id.as_str().into(),
            SettingsField::Key => self.key.as_str().into(),
            SettingsField::Value => self.value.as_str().into(),
            SettingsField::Category => self.category.as_str().into(),
            SettingsField::Description => self.description.clone().into(),
            SettingsField::CreatedAt => self.created_at.into(),
            SettingsField::UpdatedAt => self.updated_at.into(),
        }
    }
}

// =============================================================================
// StoreSettings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreSettings {
    pub id: String,
    pub store_id: String,
    /// Unique within the store.
    pub key: String,
    pub value: String,
    pub category: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreSettingsField {
    Id,
    StoreId,
    Key,
    Value,
    Category,
    Description,
    CreatedAt,
    UpdatedAt,
}

impl Field for StoreSettingsField {
    fn column(self) -> &'static str {
        match self {
            StoreSettingsField::Id => "id",
            StoreSettingsField::StoreId => "store_id",
            StoreSettingsField::Key => "key",
            StoreSettingsField::Value => "value",
            StoreSettingsField::Category => "category",
            StoreSettingsField::Description => "description",
            StoreSettingsField::CreatedAt => "created_at",
            StoreSettingsField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            StoreSettingsField::Id => "id",
            StoreSettingsField::StoreId => "storeId",
            StoreSettingsField::Key => "key",
            StoreSettingsField::Value => "value",
            StoreSettingsField::Category => "category",
            StoreSettingsField::Description => "description",
            StoreSettingsField::CreatedAt => "createdAt",
            StoreSettingsField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            StoreSettingsField::CreatedAt | StoreSettingsField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, StoreSettingsField::Description)
    }

    fn all() -> &'static [Self] {
        &[
            StoreSettingsField::Id,
            StoreSettingsField::StoreId,
            StoreSettingsField::Key,
            StoreSettingsField::Value,
            StoreSettingsField::Category,
            StoreSettingsField::Description,
            StoreSettingsField::CreatedAt,
            StoreSettingsField::UpdatedAt,
        ]
    }
}

/// Primary key, or the compound `(storeId, key)` unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreSettingsWhereUnique {
    Id(String),
    #[serde(rename_all = "camelCase")]
    StoreIdKey { store_id: String, key: String },
}

impl StoreSettingsWhereUnique {
    pub fn store_key(store_id: impl Into<String>, key: impl Into<String>) -> Self {
        StoreSettingsWhereUnique::StoreIdKey {
            store_id: store_id.into(),
            key: key.into(),
        }
    }
}

impl UniqueWhere<StoreSettingsField> for StoreSettingsWhereUnique {
    fn to_filter(&self) -> Filter<StoreSettingsField> {
        match self {
            StoreSettingsWhereUnique::Id(id) => Filter::equals(StoreSettingsField::Id, id),
            StoreSettingsWhereUnique::StoreIdKey { store_id, key } => Filter::and([
                Filter::equals(StoreSettingsField::StoreId, store_id),
                Filter::equals(StoreSettingsField::Key, key),
            ]),
        }
    }

    fn describe(&self) -> String {
        match self {
            StoreSettingsWhereUnique::Id(id) => format!("id={id}"),
            StoreSettingsWhereUnique::StoreIdKey { store_id, key } => {
                format!("storeId={store_id}, key={key}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreSettings {
    #[serde(default)]
    pub id: Option<String>,
    pub store_id: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateStoreSettings {
    pub fn new(
        store_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        CreateStoreSettings {
            id: None,
            store_id: store_id.into(),
            key: key.into(),
            value: value.into(),
            category: None,
            description: None,
        }
    }
}

impl CreateInput<StoreSettingsField> for CreateStoreSettings {
    fn validate(&self) -> ValidationResult<()> {
        validate_id("storeId", &self.store_id)?;
        validate_settings_key(&self.key)?;
        if let Some(category) = &self.category {
            validate_name("category", category)?;
        }
        Ok(())
    }

    fn into_values(self) -> Vec<(StoreSettingsField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, StoreSettingsField::Id, self.id);
        out.push((StoreSettingsField::StoreId, self.store_id.into()));
        out.push((StoreSettingsField::Key, self.key.into()));
        out.push((StoreSettingsField::Value, self.value.into()));
        push_opt(&mut out, StoreSettingsField::Category, self.category);
        push_opt(&mut out, StoreSettingsField::Description, self.description);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStoreSettings {
    pub store_id: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateStoreSettings {
    /// Update that only replaces the value.
    pub fn value(value: impl Into<String>) -> Self {
        UpdateStoreSettings {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl UpdateInput<StoreSettingsField> for UpdateStoreSettings {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(store_id) = &self.store_id {
            validate_id("storeId", store_id)?;
        }
        if let Some(key) = &self.key {
            validate_settings_key(key)?;
        }
        if let Some(category) = &self.category {
            validate_name("category", category)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<StoreSettingsField>> {
        let mut out = Vec::new();
        push_set(&mut out, StoreSettingsField::StoreId, &self.store_id);
        push_set(&mut out, StoreSettingsField::Key, &self.key);
        push_set(&mut out, StoreSettingsField::Value, &self.value);
        push_set(&mut out, StoreSettingsField::Category, &self.category);
        push_nullable(&mut out, StoreSettingsField::Description, &self.description);
        out
    }
}

impl Entity for StoreSettings {
    type Field = StoreSettingsField;
    type Unique = StoreSettingsWhereUnique;
    type Create = CreateStoreSettings;
    type Update = UpdateStoreSettings;

    const NAME: &'static str = "StoreSettings";
    const TABLE: &'static str = "store_settings";
    const ID: StoreSettingsField = StoreSettingsField::Id;
    const CREATED_AT: StoreSettingsField = StoreSettingsField::CreatedAt;
    const UPDATED_AT: StoreSettingsField = StoreSettingsField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: StoreSettingsField) -> Value {
        match field {
            StoreSettingsField::Id => self.id.as_str().into(),
            StoreSettingsField::StoreId => self.store_id.as_str().into(),
            StoreSettingsField::Key => self.key.as_str().into(),
            StoreSettingsField::Value => self.value.as_str().into(),
            StoreSettingsField::Category => self.category.as_str().into(),
            StoreSettingsField::Description => self.description.clone().into(),
            StoreSettingsField::CreatedAt => self.created_at.into(),
            StoreSettingsField::UpdatedAt => self.updated_at.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_unique_is_compound() {
        let unique = StoreSettingsWhereUnique::store_key("s1", "receipt.footer");
        assert_eq!(
            unique.to_filter().fields(),
            vec![StoreSettingsField::StoreId, StoreSettingsField::Key]
        );
    }

    #[test]
    fn test_category_omitted_uses_default() {
        let values = CreateSettings::new("tax_enabled", "true").into_values();
        assert!(values.iter().all(|(f, _)| *f != SettingsField::Category));
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(CreateStoreSettings::new("s1", "bad key", "x").validate().is_err());
        assert!(UpdateSettings {
            key: Some(String::new()),
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
