//! Catalog: categories and the products filed under them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{push_opt, CreateInput, Entity, UniqueWhere, UpdateInput};
use crate::money::Money;
use crate::query::filter::Filter;
use crate::query::update::{push_nullable, push_number, push_set, Assignment, NumberUpdate};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::{validate_amount, validate_id, validate_name, validate_stock, ValidationResult};

// =============================================================================
// Category
// =============================================================================

/// A product grouping within one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub store_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryField {
    Id,
    Name,
    StoreId,
    CreatedAt,
    UpdatedAt,
}

impl Field for CategoryField {
    fn column(self) -> &'static str {
        match self {
            CategoryField::Id => "id",
            CategoryField::Name => "name",
            CategoryField::StoreId => "store_id",
            CategoryField::CreatedAt => "created_at",
            CategoryField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            CategoryField::Id => "id",
            CategoryField::Name => "name",
            CategoryField::StoreId => "storeId",
            CategoryField::CreatedAt => "createdAt",
            CategoryField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            CategoryField::CreatedAt | CategoryField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn all() -> &'static [Self] {
        &[
            CategoryField::Id,
            CategoryField::Name,
            CategoryField::StoreId,
            CategoryField::CreatedAt,
            CategoryField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryWhereUnique {
    Id(String),
}

impl UniqueWhere<CategoryField> for CategoryWhereUnique {
    fn to_filter(&self) -> Filter<CategoryField> {
        match self {
            CategoryWhereUnique::Id(id) => Filter::equals(CategoryField::Id, id),
        }
    }

    fn describe(&self) -> String {
        match self {
            CategoryWhereUnique::Id(id) => format!("id={id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub store_id: String,
}

impl CreateCategory {
    pub fn new(name: impl Into<String>, store_id: impl Into<String>) -> Self {
        CreateCategory {
            id: None,
            name: name.into(),
            store_id: store_id.into(),
        }
    }
}

impl CreateInput<CategoryField> for CreateCategory {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_id("storeId", &self.store_id)
    }

    fn into_values(self) -> Vec<(CategoryField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, CategoryField::Id, self.id);
        out.push((CategoryField::Name, self.name.into()));
        out.push((CategoryField::StoreId, self.store_id.into()));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub store_id: Option<String>,
}

impl UpdateInput<CategoryField> for UpdateCategory {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(store_id) = &self.store_id {
            validate_id("storeId", store_id)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<CategoryField>> {
        let mut out = Vec::new();
        push_set(&mut out, CategoryField::Name, &self.name);
        push_set(&mut out, CategoryField::StoreId, &self.store_id);
        out
    }
}

impl Entity for Category {
    type Field = CategoryField;
    type Unique = CategoryWhereUnique;
    type Create = CreateCategory;
    type Update = UpdateCategory;

    const NAME: &'static str = "Category";
    const TABLE: &'static str = "categories";
    const ID: CategoryField = CategoryField::Id;
    const CREATED_AT: CategoryField = CategoryField::CreatedAt;
    const UPDATED_AT: CategoryField = CategoryField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: CategoryField) -> Value {
        match field {
            CategoryField::Id => self.id.as_str().into(),
            CategoryField::Name => self.name.as_str().into(),
            CategoryField::StoreId => self.store_id.as_str().into(),
            CategoryField::CreatedAt => self.created_at.into(),
            CategoryField::UpdatedAt => self.updated_at.into(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in minor currency units.
    pub price: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Image URL.
    pub image: Option<String>,
    pub category_id: String,
    pub store_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price as [`Money`].
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.price)
    }

    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductField {
    Id,
    Name,
    Description,
    Price,
    Stock,
    Image,
    CategoryId,
    StoreId,
    CreatedAt,
    UpdatedAt,
}

impl Field for ProductField {
    fn column(self) -> &'static str {
        match self {
            ProductField::Id => "id",
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Price => "price",
            ProductField::Stock => "stock",
            ProductField::Image => "image",
            ProductField::CategoryId => "category_id",
            ProductField::StoreId => "store_id",
            ProductField::CreatedAt => "created_at",
            ProductField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ProductField::Id => "id",
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Price => "price",
            ProductField::Stock => "stock",
            ProductField::Image => "image",
            ProductField::CategoryId => "categoryId",
            ProductField::StoreId => "storeId",
            ProductField::CreatedAt => "createdAt",
            ProductField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            ProductField::Price | ProductField::Stock => FieldKind::Int,
            ProductField::CreatedAt | ProductField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, ProductField::Description | ProductField::Image)
    }

    fn all() -> &'static [Self] {
        &[
            ProductField::Id,
            ProductField::Name,
            ProductField::Description,
            ProductField::Price,
            ProductField::Stock,
            ProductField::Image,
            ProductField::CategoryId,
            ProductField::StoreId,
            ProductField::CreatedAt,
            ProductField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductWhereUnique {
    Id(String),
}

impl UniqueWhere<ProductField> for ProductWhereUnique {
    fn to_filter(&self) -> Filter<ProductField> {
        match self {
            ProductWhereUnique::Id(id) => Filter::equals(ProductField::Id, id),
        }
    }

    fn describe(&self) -> String {
        match self {
            ProductWhereUnique::Id(id) => format!("id={id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    pub category_id: String,
    pub store_id: String,
}

impl CreateProduct {
    pub fn new(
        name: impl Into<String>,
        price: i64,
        category_id: impl Into<String>,
        store_id: impl Into<String>,
    ) -> Self {
        CreateProduct {
            id: None,
            name: name.into(),
            description: None,
            price,
            stock: None,
            image: None,
            category_id: category_id.into(),
            store_id: store_id.into(),
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }
}

impl CreateInput<ProductField> for CreateProduct {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_amount("price", self.price)?;
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        validate_id("categoryId", &self.category_id)?;
        validate_id("storeId", &self.store_id)
    }

    fn into_values(self) -> Vec<(ProductField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, ProductField::Id, self.id);
        out.push((ProductField::Name, self.name.into()));
        push_opt(&mut out, ProductField::Description, self.description);
        out.push((ProductField::Price, self.price.into()));
        push_opt(&mut out, ProductField::Stock, self.stock);
        push_opt(&mut out, ProductField::Image, self.image);
        out.push((ProductField::CategoryId, self.category_id.into()));
        out.push((ProductField::StoreId, self.store_id.into()));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<NumberUpdate<i64>>,
    pub stock: Option<NumberUpdate<i64>>,
    #[serde(deserialize_with = "super::double_option")]
    pub image: Option<Option<String>>,
    pub category_id: Option<String>,
    pub store_id: Option<String>,
}

impl UpdateInput<ProductField> for UpdateProduct {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(price) = self.price.and_then(|u| u.set_value()) {
            validate_amount("price", price)?;
        }
        if let Some(stock) = self.stock.and_then(|u| u.set_value()) {
            validate_stock(stock)?;
        }
        if let Some(category_id) = &self.category_id {
            validate_id("categoryId", category_id)?;
        }
        if let Some(store_id) = &self.store_id {
            validate_id("storeId", store_id)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<ProductField>> {
        let mut out = Vec::new();
        push_set(&mut out, ProductField::Name, &self.name);
        push_nullable(&mut out, ProductField::Description, &self.description);
        push_number(&mut out, ProductField::Price, &self.price);
        push_number(&mut out, ProductField::Stock, &self.stock);
        push_nullable(&mut out, ProductField::Image, &self.image);
        push_set(&mut out, ProductField::CategoryId, &self.category_id);
        push_set(&mut out, ProductField::StoreId, &self.store_id);
        out
    }
}

impl Entity for Product {
    type Field = ProductField;
    type Unique = ProductWhereUnique;
    type Create = CreateProduct;
    type Update = UpdateProduct;

    const NAME: &'static str = "Product";
    const TABLE: &'static str = "products";
    const ID: ProductField = ProductField::Id;
    const CREATED_AT: ProductField = ProductField::CreatedAt;
    const UPDATED_AT: ProductField = ProductField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: ProductField) -> Value {
        match field {
            ProductField::Id => self.id.as_str().into(),
            ProductField::Name => self.name.as_str().into(),
            ProductField::Description => self.description.clone().into(),
            ProductField::Price => self.price.into(),
            ProductField::Stock => self.stock.into(),
            ProductField::Image => self.image.clone().into(),
            ProductField::CategoryId => self.category_id.as_str().into(),
            ProductField::StoreId => self.store_id.as_str().into(),
            ProductField::CreatedAt => self.created_at.into(),
            ProductField::UpdatedAt => self.updated_at.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_negative_price_rejected() {
        let input = CreateProduct::new("Kopi Susu", -1, "c1", "s1");
        assert!(matches!(
            input.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_stock_decrement_lowers_to_arithmetic() {
        let update = UpdateProduct {
            stock: Some(NumberUpdate::Decrement(2)),
            ..Default::default()
        };
        let assignments = update.assignments();
        assert_eq!(assignments.len(), 1);
        assert!(assignments[0].op.is_arithmetic());
        assert_eq!(assignments[0].value, Value::Int(2));
    }

    #[test]
    fn test_number_update_json_shape() {
        let update: UpdateProduct =
            serde_json::from_str(r#"{"stock": {"increment": 5}, "image": null}"#).unwrap();
        assert_eq!(update.stock, Some(NumberUpdate::Increment(5)));
        assert_eq!(update.image, Some(None));
    }

    #[test]
    fn test_string_match_only_on_text_fields() {
        use crate::query::filter::Condition;

        let ok = Filter::field(ProductField::Name, Condition::Contains("kopi".into()));
        assert!(ok.validate().is_ok());

        let bad = Filter::field(ProductField::Price, Condition::StartsWith("1".into()));
        assert!(bad.validate().is_err());
    }
}
