//! # Transactions
//!
//! A sale at a store, rung up by a cashier, and its line items.
//!
//! ## Money Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item.subtotal      == item.price × item.quantity                       │
//! │  tx.totalAmount     == Σ item.subtotal          (nested create)         │
//! │  tx.changeAmount    == tx.amountPaid − tx.totalAmount   (COMPLETED)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Omitted subtotals and change amounts are computed; supplied ones must
//! agree with the rule or the input is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::enums::{PaymentMethod, TransactionStatus};
use crate::entity::{push_opt, CreateInput, Entity, UniqueWhere, UpdateInput};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{change_due, Money};
use crate::query::filter::Filter;
use crate::query::update::{push_nullable, push_number, push_set, Assignment, NumberUpdate};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::{validate_amount, validate_id, validate_quantity, ValidationResult};

// =============================================================================
// Transaction
// =============================================================================

/// A sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Grand total in minor units.
    pub total_amount: i64,
    pub amount_paid: i64,
    pub change_amount: i64,
    pub payment_method: PaymentMethod,
    pub cashier_user_id: String,
    pub store_id: String,
    /// Snap token when paid through Midtrans.
    pub midtrans_token: Option<String>,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_amount)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Fails unless the transaction is PENDING.
    pub fn ensure_pending(&self, operation: &str) -> CoreResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::InvalidTransactionStatus {
                transaction_id: self.id.clone(),
                current_status: self.status.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    /// Builds the update that completes this transaction with `amount_paid`.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidTransactionStatus`] unless PENDING
    /// - [`CoreError::InvalidPaymentAmount`] when underpaid
    pub fn completion(&self, amount_paid: i64) -> CoreResult<UpdateTransaction> {
        self.ensure_pending("complete")?;
        validate_amount("amountPaid", amount_paid)?;
        let change = change_due(self.total(), Money::from_minor(amount_paid))?;

        Ok(UpdateTransaction {
            amount_paid: Some(NumberUpdate::Set(amount_paid)),
            change_amount: Some(NumberUpdate::Set(change.minor())),
            status: Some(TransactionStatus::Completed),
            ..Default::default()
        })
    }

    /// Builds the update that cancels this transaction.
    pub fn cancellation(&self) -> CoreResult<UpdateTransaction> {
        self.ensure_pending("cancel")?;
        Ok(UpdateTransaction {
            status: Some(TransactionStatus::Cancelled),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionField {
    Id,
    TotalAmount,
    AmountPaid,
    ChangeAmount,
    PaymentMethod,
    CashierUserId,
    StoreId,
    MidtransToken,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl Field for TransactionField {
    fn column(self) -> &'static str {
        match self {
            TransactionField::Id => "id",
            TransactionField::TotalAmount => "total_amount",
            TransactionField::AmountPaid => "amount_paid",
            TransactionField::ChangeAmount => "change_amount",
            TransactionField::PaymentMethod => "payment_method",
            TransactionField::CashierUserId => "cashier_user_id",
            TransactionField::StoreId => "store_id",
            TransactionField::MidtransToken => "midtrans_token",
            TransactionField::Status => "status",
            TransactionField::CreatedAt => "created_at",
            TransactionField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            TransactionField::Id => "id",
            TransactionField::TotalAmount => "totalAmount",
            TransactionField::AmountPaid => "amountPaid",
            TransactionField::ChangeAmount => "changeAmount",
            TransactionField::PaymentMethod => "paymentMethod",
            TransactionField::CashierUserId => "cashierUserId",
            TransactionField::StoreId => "storeId",
            TransactionField::MidtransToken => "midtransToken",
            TransactionField::Status => "status",
            TransactionField::CreatedAt => "createdAt",
            TransactionField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            TransactionField::TotalAmount
            | TransactionField::AmountPaid
            | TransactionField::ChangeAmount => FieldKind::Int,
            TransactionField::PaymentMethod => FieldKind::Enum(PaymentMethod::VALUES),
            TransactionField::Status => FieldKind::Enum(TransactionStatus::VALUES),
            TransactionField::CreatedAt | TransactionField::UpdatedAt => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, TransactionField::MidtransToken)
    }

    fn all() -> &'static [Self] {
        &[
            TransactionField::Id,
            TransactionField::TotalAmount,
            TransactionField::AmountPaid,
            TransactionField::ChangeAmount,
            TransactionField::PaymentMethod,
            TransactionField::CashierUserId,
            TransactionField::StoreId,
            TransactionField::MidtransToken,
            TransactionField::Status,
            TransactionField::CreatedAt,
            TransactionField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionWhereUnique {
    Id(String),
}

impl UniqueWhere<TransactionField> for TransactionWhereUnique {
    fn to_filter(&self) -> Filter<TransactionField> {
        match self {
            TransactionWhereUnique::Id(id) => Filter::equals(TransactionField::Id, id),
        }
    }

    fn describe(&self) -> String {
        match self {
            TransactionWhereUnique::Id(id) => format!("id={id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    #[serde(default)]
    pub id: Option<String>,
    pub total_amount: i64,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    #[serde(default)]
    pub change_amount: Option<i64>,
    pub payment_method: PaymentMethod,
    pub cashier_user_id: String,
    pub store_id: String,
    #[serde(default)]
    pub midtrans_token: Option<String>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

impl CreateTransaction {
    pub fn new(
        total_amount: i64,
        payment_method: PaymentMethod,
        cashier_user_id: impl Into<String>,
        store_id: impl Into<String>,
    ) -> Self {
        CreateTransaction {
            id: None,
            total_amount,
            amount_paid: None,
            change_amount: None,
            payment_method,
            cashier_user_id: cashier_user_id.into(),
            store_id: store_id.into(),
            midtrans_token: None,
            status: None,
        }
    }

    /// Marks the new transaction as already paid.
    pub fn paid(mut self, amount_paid: i64) -> Self {
        self.amount_paid = Some(amount_paid);
        self.status = Some(TransactionStatus::Completed);
        self
    }

    fn is_completed(&self) -> bool {
        self.status == Some(TransactionStatus::Completed)
    }

    /// Change owed, or `None` when the status is not COMPLETED.
    fn expected_change(&self) -> CoreResult<Option<Money>> {
        if !self.is_completed() {
            return Ok(None);
        }
        let paid = Money::from_minor(self.amount_paid.unwrap_or(0));
        change_due(Money::from_minor(self.total_amount), paid).map(Some)
    }
}

impl CreateInput<TransactionField> for CreateTransaction {
    fn validate(&self) -> ValidationResult<()> {
        validate_amount("totalAmount", self.total_amount)?;
        if let Some(paid) = self.amount_paid {
            validate_amount("amountPaid", paid)?;
        }
        if let Some(change) = self.change_amount {
            validate_amount("changeAmount", change)?;
        }
        validate_id("cashierUserId", &self.cashier_user_id)?;
        validate_id("storeId", &self.store_id)?;

        let expected = self
            .expected_change()
            .map_err(|e| rule_violation("amountPaid", e))?;
        if let (Some(expected), Some(given)) = (expected, self.change_amount) {
            if expected.minor() != given {
                return Err(ValidationError::InvalidFormat {
                    field: "changeAmount".to_string(),
                    reason: format!("must equal amountPaid - totalAmount ({expected})"),
                });
            }
        }
        Ok(())
    }

    fn into_values(self) -> Vec<(TransactionField, Value)> {
        let computed_change = match (self.change_amount, self.is_completed()) {
            (None, true) => Some(
                self.amount_paid
                    .unwrap_or(0)
                    .saturating_sub(self.total_amount),
            ),
            (given, _) => given,
        };

        let mut out = Vec::new();
        push_opt(&mut out, TransactionField::Id, self.id);
        out.push((TransactionField::TotalAmount, self.total_amount.into()));
        push_opt(&mut out, TransactionField::AmountPaid, self.amount_paid);
        push_opt(&mut out, TransactionField::ChangeAmount, computed_change);
        out.push((TransactionField::PaymentMethod, self.payment_method.into()));
        out.push((TransactionField::CashierUserId, self.cashier_user_id.into()));
        out.push((TransactionField::StoreId, self.store_id.into()));
        push_opt(&mut out, TransactionField::MidtransToken, self.midtrans_token);
        push_opt(&mut out, TransactionField::Status, self.status);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTransaction {
    pub total_amount: Option<NumberUpdate<i64>>,
    pub amount_paid: Option<NumberUpdate<i64>>,
    pub change_amount: Option<NumberUpdate<i64>>,
    pub payment_method: Option<PaymentMethod>,
    pub cashier_user_id: Option<String>,
    pub store_id: Option<String>,
    #[serde(deserialize_with = "super::double_option")]
    pub midtrans_token: Option<Option<String>>,
    pub status: Option<TransactionStatus>,
}

impl UpdateInput<TransactionField> for UpdateTransaction {
    fn validate(&self) -> ValidationResult<()> {
        let total = self.total_amount.and_then(|u| u.set_value());
        let paid = self.amount_paid.and_then(|u| u.set_value());
        let change = self.change_amount.and_then(|u| u.set_value());

        for (field, value) in [
            ("totalAmount", total),
            ("amountPaid", paid),
            ("changeAmount", change),
        ] {
            if let Some(v) = value {
                validate_amount(field, v)?;
            }
        }
        if let Some(cashier) = &self.cashier_user_id {
            validate_id("cashierUserId", cashier)?;
        }
        if let Some(store_id) = &self.store_id {
            validate_id("storeId", store_id)?;
        }

        // Only checkable when the update itself carries all three amounts.
        if self.status == Some(TransactionStatus::Completed) {
            if let (Some(total), Some(paid), Some(change)) = (total, paid, change) {
                let expected = change_due(Money::from_minor(total), Money::from_minor(paid))
                    .map_err(|e| rule_violation("amountPaid", e))?;
                if expected.minor() != change {
                    return Err(ValidationError::InvalidFormat {
                        field: "changeAmount".to_string(),
                        reason: format!("must equal amountPaid - totalAmount ({expected})"),
                    });
                }
            }
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<TransactionField>> {
        let mut out = Vec::new();
        push_number(&mut out, TransactionField::TotalAmount, &self.total_amount);
        push_number(&mut out, TransactionField::AmountPaid, &self.amount_paid);
        push_number(&mut out, TransactionField::ChangeAmount, &self.change_amount);
        push_set(&mut out, TransactionField::PaymentMethod, &self.payment_method);
        push_set(&mut out, TransactionField::CashierUserId, &self.cashier_user_id);
        push_set(&mut out, TransactionField::StoreId, &self.store_id);
        push_nullable(&mut out, TransactionField::MidtransToken, &self.midtrans_token);
        push_set(&mut out, TransactionField::Status, &self.status);
        out
    }
}

impl Entity for Transaction {
    type Field = TransactionField;
    type Unique = TransactionWhereUnique;
    type Create = CreateTransaction;
    type Update = UpdateTransaction;

    const NAME: &'static str = "Transaction";
    const TABLE: &'static str = "transactions";
    const ID: TransactionField = TransactionField::Id;
    const CREATED_AT: TransactionField = TransactionField::CreatedAt;
    const UPDATED_AT: TransactionField = TransactionField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: TransactionField) -> Value {
        match field {
            TransactionField::Id => self.id.as_str().into(),
            TransactionField::TotalAmount => self.total_amount.into(),
            TransactionField::AmountPaid => self.amount_paid.into(),
            TransactionField::ChangeAmount => self.change_amount.into(),
            TransactionField::PaymentMethod => self.payment_method.into(),
            TransactionField::CashierUserId => self.cashier_user_id.as_str().into(),
            TransactionField::StoreId => self.store_id.as_str().into(),
            TransactionField::MidtransToken => self.midtrans_token.clone().into(),
            TransactionField::Status => self.status.into(),
            TransactionField::CreatedAt => self.created_at.into(),
            TransactionField::UpdatedAt => self.updated_at.into(),
        }
    }

    /// A COMPLETED row keeps `changeAmount == amountPaid - totalAmount`.
    ///
    /// An outstanding balance (paid below total) means no change is due and
    /// the change is 0. [`Transaction::completion`] is the path that rejects
    /// underpayment.
    fn derived_update(&self, update: &UpdateTransaction) -> ValidationResult<Option<UpdateTransaction>> {
        let touched = update.status.is_some()
            || update.total_amount.is_some()
            || update.amount_paid.is_some()
            || update.change_amount.is_some();
        if !touched || self.status != TransactionStatus::Completed {
            return Ok(None);
        }

        let difference = Money::from_minor(self.amount_paid)
            .checked_sub(self.total())
            .map_err(|e| rule_violation("changeAmount", e))?;
        let expected = if difference.is_negative() {
            Money::zero()
        } else {
            difference
        };
        if self.change_amount == expected.minor() {
            return Ok(None);
        }
        if update.change_amount.is_some() {
            return Err(ValidationError::InvalidFormat {
                field: "changeAmount".to_string(),
                reason: format!("must equal amountPaid - totalAmount ({expected})"),
            });
        }
        Ok(Some(UpdateTransaction {
            change_amount: Some(NumberUpdate::Set(expected.minor())),
            ..Default::default()
        }))
    }
}

// =============================================================================
// TransactionItem
// =============================================================================

/// One line of a transaction. `price` is the unit price at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price: i64,
    pub subtotal: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionItemField {
    Id,
    TransactionId,
    ProductId,
    Quantity,
    Price,
    Subtotal,
    CreatedAt,
    UpdatedAt,
}

impl Field for TransactionItemField {
    fn column(self) -> &'static str {
        match self {
            TransactionItemField::Id => "id",
            TransactionItemField::TransactionId => "transaction_id",
            TransactionItemField::ProductId => "product_id",
            TransactionItemField::Quantity => "quantity",
            TransactionItemField::Price => "price",
            TransactionItemField::Subtotal => "subtotal",
            TransactionItemField::CreatedAt => "created_at",
            TransactionItemField::UpdatedAt => "updated_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            TransactionItemField::Id => "id",
            TransactionItemField::TransactionId => "transactionId",
            TransactionItemField::ProductId => "productId",
            TransactionItemField::Quantity => "quantity",
            TransactionItemField::Price => "price",
            TransactionItemField::Subtotal => "subtotal",
            TransactionItemField::CreatedAt => "createdAt",
            TransactionItemField::UpdatedAt => "updatedAt",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            TransactionItemField::Quantity
            | TransactionItemField::Price
            | TransactionItemField::Subtotal => FieldKind::Int,
            TransactionItemField::CreatedAt | TransactionItemField::UpdatedAt => {
                FieldKind::DateTime
            }
            _ => FieldKind::Text,
        }
    }

    fn all() -> &'static [Self] {
        &[
            TransactionItemField::Id,
            TransactionItemField::TransactionId,
            TransactionItemField::ProductId,
            TransactionItemField::Quantity,
            TransactionItemField::Price,
            TransactionItemField::Subtotal,
            TransactionItemField::CreatedAt,
            TransactionItemField::UpdatedAt,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionItemWhereUnique {
    Id(String),
}

impl UniqueWhere<TransactionItemField> for TransactionItemWhereUnique {
    fn to_filter(&self) -> Filter<TransactionItemField> {
        match self {
            TransactionItemWhereUnique::Id(id) => Filter::equals(TransactionItemField::Id, id),
        }
    }

    fn describe(&self) -> String {
        match self {
            TransactionItemWhereUnique::Id(id) => format!("id={id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionItem {
    #[serde(default)]
    pub id: Option<String>,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price: i64,
    #[serde(default)]
    pub subtotal: Option<i64>,
}

impl CreateTransactionItem {
    pub fn new(
        transaction_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: i64,
        price: i64,
    ) -> Self {
        CreateTransactionItem {
            id: None,
            transaction_id: transaction_id.into(),
            product_id: product_id.into(),
            quantity,
            price,
            subtotal: None,
        }
    }

    /// `price × quantity`.
    pub fn line_total(&self) -> CoreResult<Money> {
        Money::from_minor(self.price).times(self.quantity)
    }
}

impl CreateInput<TransactionItemField> for CreateTransactionItem {
    fn validate(&self) -> ValidationResult<()> {
        validate_id("transactionId", &self.transaction_id)?;
        validate_id("productId", &self.product_id)?;
        validate_quantity(self.quantity)?;
        validate_amount("price", self.price)?;
        check_subtotal(self.price, self.quantity, self.subtotal)
    }

    fn into_values(self) -> Vec<(TransactionItemField, Value)> {
        let subtotal = self
            .subtotal
            .unwrap_or_else(|| self.price.saturating_mul(self.quantity));

        let mut out = Vec::new();
        push_opt(&mut out, TransactionItemField::Id, self.id);
        out.push((TransactionItemField::TransactionId, self.transaction_id.into()));
        out.push((TransactionItemField::ProductId, self.product_id.into()));
        out.push((TransactionItemField::Quantity, self.quantity.into()));
        out.push((TransactionItemField::Price, self.price.into()));
        out.push((TransactionItemField::Subtotal, subtotal.into()));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTransactionItem {
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub quantity: Option<NumberUpdate<i64>>,
    pub price: Option<NumberUpdate<i64>>,
    pub subtotal: Option<NumberUpdate<i64>>,
}

impl UpdateTransactionItem {
    fn set_values(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        (
            self.quantity.and_then(|u| u.set_value()),
            self.price.and_then(|u| u.set_value()),
            self.subtotal.and_then(|u| u.set_value()),
        )
    }
}

impl UpdateInput<TransactionItemField> for UpdateTransactionItem {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(transaction_id) = &self.transaction_id {
            validate_id("transactionId", transaction_id)?;
        }
        if let Some(product_id) = &self.product_id {
            validate_id("productId", product_id)?;
        }

        let (quantity, price, subtotal) = self.set_values();
        if let Some(q) = quantity {
            validate_quantity(q)?;
        }
        if let Some(p) = price {
            validate_amount("price", p)?;
        }
        if let Some(s) = subtotal {
            validate_amount("subtotal", s)?;
        }
        if let (Some(q), Some(p)) = (quantity, price) {
            check_subtotal(p, q, subtotal)?;
        }
        Ok(())
    }

    fn assignments(&self) -> Vec<Assignment<TransactionItemField>> {
        let mut out = Vec::new();
        push_set(&mut out, TransactionItemField::TransactionId, &self.transaction_id);
        push_set(&mut out, TransactionItemField::ProductId, &self.product_id);
        push_number(&mut out, TransactionItemField::Quantity, &self.quantity);
        push_number(&mut out, TransactionItemField::Price, &self.price);
        push_number(&mut out, TransactionItemField::Subtotal, &self.subtotal);

        // Re-pricing a line with both values known keeps the subtotal in step.
        if let (Some(q), Some(p), None) = self.set_values() {
            out.push(Assignment::set(
                TransactionItemField::Subtotal,
                p.saturating_mul(q),
            ));
        }
        out
    }
}

impl Entity for TransactionItem {
    type Field = TransactionItemField;
    type Unique = TransactionItemWhereUnique;
    type Create = CreateTransactionItem;
    type Update = UpdateTransactionItem;

    const NAME: &'static str = "TransactionItem";
    const TABLE: &'static str = "transaction_items";
    const ID: TransactionItemField = TransactionItemField::Id;
    const CREATED_AT: TransactionItemField = TransactionItemField::CreatedAt;
    const UPDATED_AT: TransactionItemField = TransactionItemField::UpdatedAt;

    fn id(&self) -> &str {
        &self.id
    }

    fn value_of(&self, field: TransactionItemField) -> Value {
        match field {
            TransactionItemField::Id => self.id.as_str().into(),
            TransactionItemField::TransactionId => self.transaction_id.as_str().into(),
            TransactionItemField::ProductId => self.product_id.as_str().into(),
            TransactionItemField::Quantity => self.quantity.into(),
            TransactionItemField::Price => self.price.into(),
            TransactionItemField::Subtotal => self.subtotal.into(),
            TransactionItemField::CreatedAt => self.created_at.into(),
            TransactionItemField::UpdatedAt => self.updated_at.into(),
        }
    }

    /// Quantity or price changes of any kind recompute the subtotal.
    fn derived_update(&self, update: &UpdateTransactionItem) -> ValidationResult<Option<UpdateTransactionItem>> {
        if update.quantity.is_none() && update.price.is_none() && update.subtotal.is_none() {
            return Ok(None);
        }

        let expected = Money::from_minor(self.price)
            .times(self.quantity)
            .map_err(|e| rule_violation("subtotal", e))?;
        if self.subtotal == expected.minor() {
            return Ok(None);
        }
        if update.subtotal.is_some() {
            return Err(ValidationError::InvalidFormat {
                field: "subtotal".to_string(),
                reason: format!("must equal price x quantity ({expected})"),
            });
        }
        Ok(Some(UpdateTransactionItem {
            subtotal: Some(NumberUpdate::Set(expected.minor())),
            ..Default::default()
        }))
    }
}

// =============================================================================
// Nested create
// =============================================================================

/// A line of a transaction created together with its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price snapshot.
    pub price: i64,
    #[serde(default)]
    pub subtotal: Option<i64>,
}

impl NewTransactionLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, price: i64) -> Self {
        NewTransactionLine {
            product_id: product_id.into(),
            quantity,
            price,
            subtotal: None,
        }
    }

    /// Attaches the line to a parent transaction.
    pub fn for_transaction(&self, transaction_id: &str) -> CreateTransactionItem {
        CreateTransactionItem {
            id: None,
            transaction_id: transaction_id.to_string(),
            product_id: self.product_id.clone(),
            quantity: self.quantity,
            price: self.price,
            subtotal: self.subtotal,
        }
    }
}

/// A transaction plus its items, written in one SQL transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionWithItems {
    pub transaction: CreateTransaction,
    pub items: Vec<NewTransactionLine>,
}

impl CreateTransactionWithItems {
    /// Validates the parent, every line, and that the total equals the sum of
    /// line subtotals.
    pub fn validate(&self) -> CoreResult<()> {
        self.transaction.validate()?;

        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        let mut subtotals = Vec::with_capacity(self.items.len());
        for line in &self.items {
            // The parent id is assigned later; validate the line shape only.
            let item = line.for_transaction("pending");
            item.validate()?;
            subtotals.push(item.line_total()?);
        }

        let items_total = Money::total(subtotals)?;
        if items_total.minor() != self.transaction.total_amount {
            return Err(CoreError::TotalMismatch {
                total: self.transaction.total_amount,
                items_total: items_total.minor(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_subtotal(price: i64, quantity: i64, subtotal: Option<i64>) -> ValidationResult<()> {
    let expected = Money::from_minor(price)
        .times(quantity)
        .map_err(|e| rule_violation("subtotal", e))?;

    match subtotal {
        Some(given) if given != expected.minor() => Err(ValidationError::InvalidFormat {
            field: "subtotal".to_string(),
            reason: format!("must equal price x quantity ({expected})"),
        }),
        _ => Ok(()),
    }
}

fn rule_violation(field: &str, err: CoreError) -> ValidationError {
    match err {
        CoreError::Validation(inner) => inner,
        other => ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: other.to_string(),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending(total: i64) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: "tx-1".into(),
            total_amount: total,
            amount_paid: 0,
            change_amount: 0,
            payment_method: PaymentMethod::Cash,
            cashier_user_id: "u1".into(),
            store_id: "s1".into(),
            midtrans_token: None,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_item_subtotal_computed_when_omitted() {
        let values = CreateTransactionItem::new("tx-1", "p1", 3, 12_500).into_values();
        let subtotal = values
            .iter()
            .find(|(f, _)| *f == TransactionItemField::Subtotal)
            .map(|(_, v)| v.clone());
        assert_eq!(subtotal, Some(Value::Int(37_500)));
    }

    #[test]
    fn test_item_subtotal_mismatch_rejected() {
        let mut item = CreateTransactionItem::new("tx-1", "p1", 3, 12_500);
        item.subtotal = Some(30_000);
        assert!(matches!(
            item.validate(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_item_quantity_must_be_positive() {
        let item = CreateTransactionItem::new("tx-1", "p1", 0, 12_500);
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_completed_create_computes_change() {
        let input = CreateTransaction::new(37_500, PaymentMethod::Cash, "u1", "s1").paid(50_000);
        assert!(input.validate().is_ok());

        let values = input.into_values();
        let change = values
            .iter()
            .find(|(f, _)| *f == TransactionField::ChangeAmount)
            .map(|(_, v)| v.clone());
        assert_eq!(change, Some(Value::Int(12_500)));
    }

    #[test]
    fn test_completed_create_rejects_underpayment_and_bad_change() {
        let under = CreateTransaction::new(37_500, PaymentMethod::Cash, "u1", "s1").paid(10_000);
        assert!(under.validate().is_err());

        let mut wrong = CreateTransaction::new(37_500, PaymentMethod::Cash, "u1", "s1").paid(50_000);
        wrong.change_amount = Some(1);
        assert!(wrong.validate().is_err());
    }

    #[test]
    fn test_pending_create_leaves_defaults() {
        let values = CreateTransaction::new(10_000, PaymentMethod::Qris, "u1", "s1").into_values();
        assert!(values.iter().all(|(f, _)| *f != TransactionField::Status));
        assert!(values.iter().all(|(f, _)| *f != TransactionField::ChangeAmount));
    }

    #[test]
    fn test_completion_and_cancellation() {
        let tx = pending(37_500);
        let update = tx.completion(50_000).unwrap();
        assert_eq!(update.status, Some(TransactionStatus::Completed));
        assert_eq!(update.change_amount, Some(NumberUpdate::Set(12_500)));
        assert!(update.validate().is_ok());

        assert!(matches!(
            tx.completion(100),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));

        let mut done = pending(37_500);
        done.status = TransactionStatus::Cancelled;
        assert!(matches!(
            done.cancellation(),
            Err(CoreError::InvalidTransactionStatus { .. })
        ));
    }

    #[test]
    fn test_nested_create_total_must_match() {
        let input = CreateTransactionWithItems {
            transaction: CreateTransaction::new(40_000, PaymentMethod::Cash, "u1", "s1"),
            items: vec![
                NewTransactionLine::new("p1", 2, 15_000),
                NewTransactionLine::new("p2", 1, 10_000),
            ],
        };
        assert!(input.validate().is_ok());

        let mut wrong = input.clone();
        wrong.transaction.total_amount = 39_000;
        assert!(matches!(
            wrong.validate(),
            Err(CoreError::TotalMismatch { total: 39_000, items_total: 40_000 })
        ));
    }

    #[test]
    fn test_update_item_reprices_subtotal() {
        let update = UpdateTransactionItem {
            quantity: Some(NumberUpdate::Set(4)),
            price: Some(NumberUpdate::Set(2_000)),
            ..Default::default()
        };
        let assignments = update.assignments();
        let subtotal = assignments
            .iter()
            .find(|a| a.field == TransactionItemField::Subtotal)
            .map(|a| a.value.clone());
        assert_eq!(subtotal, Some(Value::Int(8_000)));
    }

    #[test]
    fn test_derived_subtotal_after_partial_update() {
        let now = Utc::now();
        // Row as left by `quantity = 5` on a 2 x 1000 line.
        let row = TransactionItem {
            id: "i1".into(),
            transaction_id: "tx-1".into(),
            product_id: "p1".into(),
            quantity: 5,
            price: 1_000,
            subtotal: 2_000,
            created_at: now,
            updated_at: now,
        };
        let quantity_only = UpdateTransactionItem {
            quantity: Some(NumberUpdate::Set(5)),
            ..Default::default()
        };
        let fix = row.derived_update(&quantity_only).unwrap().unwrap();
        assert_eq!(fix.subtotal, Some(NumberUpdate::Set(5_000)));

        let wrong_subtotal = UpdateTransactionItem {
            subtotal: Some(NumberUpdate::Set(2_000)),
            ..quantity_only.clone()
        };
        assert!(row.derived_update(&wrong_subtotal).is_err());

        let untouched = UpdateTransactionItem {
            product_id: Some("p2".into()),
            ..Default::default()
        };
        assert_eq!(row.derived_update(&untouched).unwrap(), None);
    }

    #[test]
    fn test_derived_change_for_completed_row() {
        let mut row = pending(2_000);
        row.status = TransactionStatus::Completed;
        row.amount_paid = 5_000;
        let status_only = UpdateTransaction {
            status: Some(TransactionStatus::Completed),
            ..Default::default()
        };
        let fix = row.derived_update(&status_only).unwrap().unwrap();
        assert_eq!(fix.change_amount, Some(NumberUpdate::Set(3_000)));

        // Outstanding balance: nothing to give back.
        row.amount_paid = 0;
        row.change_amount = 3_000;
        let fix = row.derived_update(&status_only).unwrap().unwrap();
        assert_eq!(fix.change_amount, Some(NumberUpdate::Set(0)));
        row.change_amount = 0;
        assert_eq!(row.derived_update(&status_only).unwrap(), None);

        row.amount_paid = 5_000;
        row.change_amount = 1;
        let explicit = UpdateTransaction {
            change_amount: Some(NumberUpdate::Set(1)),
            ..status_only.clone()
        };
        assert!(row.derived_update(&explicit).is_err());

        assert_eq!(pending(2_000).derived_update(&status_only).unwrap(), None);
    }
}
