//! Store: the tenant every product, category and transaction belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{push_opt, CreateInput, Entity, UniqueWhere, UpdateInput};
use crate::query::filter::Filter;
use crate::query::update::{push_nullable, push_number, push_set, Assignment, NumberUpdate};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::{validate_currency, validate_name, validate_tax_rate, ValidationResult};

// =============================================================================
// Store
// =============================================================================

/// A physical outlet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Logo image URL.
    pub logo: Option<String>,
    /// Tax rate as a percentage, e.g. `11.0` for PPN 11%.
    pub tax_rate: f64,
    /// ISO 4217 code. Defaults to [`DEFAULT_CURRENCY`](crate::DEFAULT_CURRENCY).
    pub currency: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreField {
    Id,
    Name,
    Address,
    Phone,
    Email,
    Logo,
    TaxRate,
    Currency,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

impl Field for StoreField {
    fn column(self) -> &'static str {
        match self {
            StoreField::Id => "id",
            StoreField::Name => "name",
            StoreField::Address => "address",
            StoreField::Phone => "phone",
            StoreField::Email => "email",
            StoreField::Logo => "logo",
            StoreField::TaxRate => "tax_rate",
            StoreField::Currency => "currency",
            StoreField::IsActive => "is_active",
            StoreField::CreatedAt => "created_at",
            StoreField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            StoreField::Id => "id",
            StoreField::Name => "name",
            StoreField::Address => "address",
            StoreField::Phone => "phone",
            StoreField::Email => "email",
            StoreField::Logo => "logo",
            StoreField::TaxRate => "taxRate",
            StoreField::Currency => "currency",
            StoreField::IsActive => "isActive",
            StoreField::CreatedAt => "createdAt",
            StoreField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            StoreField::TaxRate => FieldKind::Float,
            StoreField::IsActive => FieldKind::Bool,
            StoreField::CreatedAt | StoreField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(
            self,
            StoreField::Address | StoreField::Phone | StoreField::Email | StoreField::Logo
        )
    }

    fn all() -> &'static [Self] {
        &[
            StoreField::Id,
            StoreField::Name,
            StoreField::Address,
            StoreField::Phone,
            StoreField::Email,
            StoreField::Logo,
            StoreField::TaxRate,
            StoreField::Currency,
            StoreField::IsActive,
            StoreField::CreatedAt,
            StoreField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreWhereUnique {
    Id(String),
}

impl UniqueWhere<StoreField> for StoreWhereUnique {
    fn to_filter(&self) -> Filter<StoreField> {
        match self {
            StoreWhereUnique::Id(id) => Filter::equals(StoreField::Id, id),
        }
    }

    fn describe(&self) -> String {
        match self {
            StoreWhereUnique::Id(id) => format!("id={id}"),
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateStore {
    pub id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo: Option<String>,
    pub tax_rate: Option<f64>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateStore {
    pub fn new(name: impl Into<String>) -> Self {
        CreateStore {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl CreateInput<StoreField> for CreateStore {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(rate) = self.tax_rate {
            validate_tax_rate(rate)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        Ok(())
    }

    fn into_values(self) -> Vec<(StoreField, Value)> {
        let mut out = Vec::new();
        push_opt(&mut out, StoreField::Id, self.id);
        out.push((StoreField::Name, self.name.into()));
        push_opt(&mut out, StoreField::Address, self.address);
        push_opt(&mut out, StoreField::Phone, self.phone);
        push_opt(&mut out, StoreField::Email, self.email);
        push_opt(&mut out, StoreField::Logo, self.logo);
        push_opt(&mut out, StoreField::TaxRate, self.tax_rate);
        push_opt(&mut out, StoreField::Currency, self.currency);
        push_opt(&mut out, StoreField::IsActive, self.is_active);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStore {
    pub name: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub address: Option<Option<String>>,
    #[serde(deserialize_with = "super::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "super::double_option")]
    pub email: Option<Option<String>>,
    #[serde(deserialize_with = "super::double_option")]
    pub logo: Option<Option<String>>,
    pub tax_rate: Option<NumberUpdate<f64>>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateInput<StoreField> for UpdateStore {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(rate) = self.tax_rate.and_then(|u| u.set_value()) {
            validate_tax_rate(rate)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<StoreField>> {
        let mut out = Vec::new();
        push_set(&mut out, StoreField::Name, &self.name);
        push_nullable(&mut out, StoreField::Address, &self.address);
        push_nullable(&mut out, StoreField::Phone, &self.phone);
        push_nullable(&mut out, StoreField::Email, &self.email);
        push_nullable(&mut out, StoreField::Logo, &self.logo);
        push_number(&mut out, StoreField::TaxRate, &self.tax_rate);
        push_set(&mut out, StoreField::Currency, &self.currency);
        push_set(&mut out, StoreField::IsActive, &self.is_active);
        out
    }
}

impl Entity for Store {
    type Field = StoreField;
    type Unique = StoreWhereUnique;
    type Create = CreateStore;
    type Update = UpdateStore;

    const NAME: &'static str = "Store";
    const TABLE: &'static str = "stores";
    const ID: StoreField = StoreField::Id;
    const CREATED_AT: StoreField = StoreField::CreatedAt;
    const UPDATED_AT: StoreField = StoreField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: StoreField) -> Value {
        match field {
            StoreField::Id => self.id.as_str().into(),
            StoreField::Name => self.name.as_str().into(),
            StoreField::Address => self.address.clone().into(),
            StoreField::Phone => self.phone.clone().into(),
            StoreField::Email => self.email.clone().into(),
            StoreField::Logo => self.logo.clone().into(),
            StoreField::TaxRate => self.tax_rate.into(),
            StoreField::Currency => self.currency.as_str().into(),
            StoreField::IsActive => self.is_active.into(),
            StoreField::CreatedAt => self.created_at.into(),
            StoreField::UpdatedAt => self.updated_at.into(),
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
    fn test_create_omits_unset_defaults() {
        let values = CreateStore::new("Toko Maju").into_values();
        let fields: Vec<_> = values.iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec![StoreField::Name]);
    }

    #[test]
    fn test_create_validation() {
        assert!(CreateStore::new("").validate().is_err());

        let mut input = CreateStore::new("Toko Maju");
        input.currency = Some("rupiah".into());
        assert!(input.validate().is_err());

        input.currency = Some("IDR".into());
        input.tax_rate = Some(150.0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_null_vs_absent() {
        let update: UpdateStore = serde_json::from_str(r#"{"address": null}"#).unwrap();
        assert_eq!(update.address, Some(None));
        assert_eq!(update.phone, None);

        let assignments = update.assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].value, Value::Null);
    }

    #[test]
    fn test_field_names_match_serde() {
        for field in StoreField::all() {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json.as_str(), Some(field.name()));
        }
    }
}
