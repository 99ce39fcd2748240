//! # Aggregate and GroupBy Arguments
//!
//! ## Aggregate
//! ```text
//! aggregate {
//!     where:  { storeId: "store-1" },
//!     _count: { _all: true },
//!     _sum:   [totalAmount],
//!     _avg:   [totalAmount],
//! }
//! → { _count: { _all: 42 }, _sum: { totalAmount: 1250000 }, _avg: { totalAmount: 29761.9 } }
//! ```
//!
//! ## GroupBy Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  by: [storeId, paymentMethod]                                           │
//! │                                                                         │
//! │  orderBy storeId asc                ✅ in `by`                          │
//! │  orderBy _sum(totalAmount) desc     ✅ aggregate expression             │
//! │  orderBy totalAmount asc            ❌ FieldNotInBy                     │
//! │                                                                         │
//! │  having paymentMethod = CASH        ✅ in `by`                          │
//! │  having _avg(totalAmount) > 50000   ✅ aggregate expression             │
//! │  having status = PENDING            ❌ FieldNotInBy                     │
//! │                                                                         │
//! │  skip / take without orderBy        ❌ Required                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! All of these checks run before any SQL is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::query::args::{FindManyArgs, SortOrder};
use crate::query::filter::{Condition, Filter};
use crate::query::value::{Field, FieldKind, Value};
use crate::validation::ValidationResult;

// =============================================================================
// Aggregate Functions
// =============================================================================

/// Aggregate function applied to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFn {
    #[serde(rename = "_count")]
    Count,
    #[serde(rename = "_avg")]
    Avg,
    #[serde(rename = "_sum")]
    Sum,
    #[serde(rename = "_min")]
    Min,
    #[serde(rename = "_max")]
    Max,
}

impl AggregateFn {
    /// SQL function name.
    pub fn sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Avg => "AVG",
            AggregateFn::Sum => "SUM",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }

    /// API key (`_count`, `_avg`, …).
    pub fn key(self) -> &'static str {
        match self {
            AggregateFn::Count => "_count",
            AggregateFn::Avg => "_avg",
            AggregateFn::Sum => "_sum",
            AggregateFn::Min => "_min",
            AggregateFn::Max => "_max",
        }
    }

    /// Kind of the aggregate's result for a field of kind `field_kind`.
    pub fn result_kind(self, field_kind: FieldKind) -> FieldKind {
        match self {
            AggregateFn::Count => FieldKind::Int,
            AggregateFn::Avg => FieldKind::Float,
            AggregateFn::Sum | AggregateFn::Min | AggregateFn::Max => field_kind,
        }
    }

    /// Whether the function may be applied to a field of kind `kind`.
    pub fn accepts(self, kind: FieldKind) -> bool {
        match self {
            AggregateFn::Avg | AggregateFn::Sum => kind.is_numeric(),
            AggregateFn::Count | AggregateFn::Min | AggregateFn::Max => true,
        }
    }

    fn check_field<F: Field>(self, field: F) -> ValidationResult<()> {
        if self.accepts(field.kind()) {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedOperation {
                field: field.name().to_string(),
                operation: self.key().to_string(),
            })
        }
    }
}

// =============================================================================
// Aggregate Selection
// =============================================================================

/// `_count` selection: `_all` plus per-field non-null counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct CountSelect<F> {
    #[serde(rename = "_all", default)]
    pub all: bool,
    #[serde(default)]
    pub fields: Vec<F>,
}

impl<F> Default for CountSelect<F> {
    fn default() -> Self {
        CountSelect {
            all: false,
            fields: Vec::new(),
        }
    }
}

impl<F: Field> CountSelect<F> {
    /// `_count: { _all: true }`.
    pub fn all() -> Self {
        CountSelect {
            all: true,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: F) -> Self {
        self.fields.push(field);
        self
    }
}

/// Which aggregates to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct AggregateSelect<F> {
    #[serde(rename = "_count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountSelect<F>>,
    #[serde(rename = "_avg", default)]
    pub avg: Vec<F>,
    #[serde(rename = "_sum", default)]
    pub sum: Vec<F>,
    #[serde(rename = "_min", default)]
    pub min: Vec<F>,
    #[serde(rename = "_max", default)]
    pub max: Vec<F>,
}

impl<F> Default for AggregateSelect<F> {
    fn default() -> Self {
        AggregateSelect {
            count: None,
            avg: Vec::new(),
            sum: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }
}

/// One aggregate column in the generated SELECT list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateExpr<F> {
    pub function: AggregateFn,
    /// `None` means `COUNT(*)`.
    pub field: Option<F>,
}

impl<F: Field> AggregateSelect<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: CountSelect<F>) -> Self {
        self.count = Some(count);
        self
    }

    pub fn avg(mut self, field: F) -> Self {
        self.avg.push(field);
        self
    }

    pub fn sum(mut self, field: F) -> Self {
        self.sum.push(field);
        self
    }

    pub fn min(mut self, field: F) -> Self {
        self.min.push(field);
        self
    }

    pub fn max(mut self, field: F) -> Self {
        self.max.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.expressions().is_empty()
    }

    /// `_avg` and `_sum` are only defined on numeric fields.
    pub fn validate(&self) -> ValidationResult<()> {
        for expr in self.expressions() {
            if let Some(field) = expr.field {
                expr.function.check_field(field)?;
            }
        }
        Ok(())
    }

    /// Flattens the selection into SELECT-list order.
    pub fn expressions(&self) -> Vec<AggregateExpr<F>> {
        let mut out = Vec::new();

        if let Some(count) = &self.count {
            if count.all {
                out.push(AggregateExpr {
                    function: AggregateFn::Count,
                    field: None,
                });
            }
            for f in &count.fields {
                out.push(AggregateExpr {
                    function: AggregateFn::Count,
                    field: Some(*f),
                });
            }
        }

        let groups = [
            (AggregateFn::Avg, &self.avg),
            (AggregateFn::Sum, &self.sum),
            (AggregateFn::Min, &self.min),
            (AggregateFn::Max, &self.max),
        ];
        for (function, fields) in groups {
            for f in fields {
                out.push(AggregateExpr {
                    function,
                    field: Some(*f),
                });
            }
        }

        out
    }
}

/// Arguments for `aggregate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>, U: Deserialize<'de>"))]
pub struct AggregateArgs<F, U> {
    #[serde(flatten)]
    pub find: FindManyArgs<F, U>,
    #[serde(flatten)]
    pub select: AggregateSelect<F>,
}

impl<F: Field, U> AggregateArgs<F, U> {
    pub fn new(select: AggregateSelect<F>) -> Self {
        AggregateArgs {
            find: FindManyArgs::default(),
            select,
        }
    }

    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.find.filter = Some(filter);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        self.find.validate()?;
        if !self.find.distinct.is_empty() {
            return Err(ValidationError::UnsupportedOperation {
                field: "distinct".to_string(),
                operation: "aggregate".to_string(),
            });
        }
        self.select.validate()
    }
}

// =============================================================================
// Aggregate Results
// =============================================================================

/// `_count` output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountResult {
    #[serde(rename = "_all", default, skip_serializing_if = "Option::is_none")]
    pub all: Option<i64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, i64>,
}

/// Output of `aggregate` (and the aggregate part of each groupBy row).
///
/// Maps are keyed by API field name. `_avg` / `_sum` / `_min` / `_max` are
/// `Value::Null` over an empty set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "_count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountResult>,
    #[serde(rename = "_avg", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub avg: BTreeMap<String, Value>,
    #[serde(rename = "_sum", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sum: BTreeMap<String, Value>,
    #[serde(rename = "_min", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min: BTreeMap<String, Value>,
    #[serde(rename = "_max", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub max: BTreeMap<String, Value>,
}

impl AggregateResult {
    /// Records one computed aggregate.
    pub fn record(&mut self, function: AggregateFn, field: Option<&str>, value: Value) {
        match function {
            AggregateFn::Count => {
                let count = self.count.get_or_insert_with(CountResult::default);
                let n = match value {
                    Value::Int(n) => n,
                    _ => 0,
                };
                match field {
                    Some(name) => {
                        count.fields.insert(name.to_string(), n);
                    }
                    None => count.all = Some(n),
                }
            }
            AggregateFn::Avg => self.insert_into(AggregateFn::Avg, field, value),
            AggregateFn::Sum => self.insert_into(AggregateFn::Sum, field, value),
            AggregateFn::Min => self.insert_into(AggregateFn::Min, field, value),
            AggregateFn::Max => self.insert_into(AggregateFn::Max, field, value),
        }
    }

    fn insert_into(&mut self, function: AggregateFn, field: Option<&str>, value: Value) {
        let Some(name) = field else { return };
        let map = match function {
            AggregateFn::Avg => &mut self.avg,
            AggregateFn::Sum => &mut self.sum,
            AggregateFn::Min => &mut self.min,
            _ => &mut self.max,
        };
        map.insert(name.to_string(), value);
    }

    /// `_count._all`, or 0 when not selected.
    pub fn count_all(&self) -> i64 {
        self.count.as_ref().and_then(|c| c.all).unwrap_or(0)
    }
}

// =============================================================================
// GroupBy
// =============================================================================

/// `having` predicate: over grouped fields or aggregate expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Having<F> {
    Field {
        field: F,
        condition: Condition,
    },
    Aggregate {
        function: AggregateFn,
        field: F,
        condition: Condition,
    },
    And(Vec<Having<F>>),
    Or(Vec<Having<F>>),
    Not(Box<Having<F>>),
}

impl<F: Field> Having<F> {
    pub fn field(field: F, condition: Condition) -> Self {
        Having::Field { field, condition }
    }

    pub fn aggregate(function: AggregateFn, field: F, condition: Condition) -> Self {
        Having::Aggregate {
            function,
            field,
            condition,
        }
    }

    fn validate(&self, by: &[F]) -> ValidationResult<()> {
        match self {
            Having::Field { field, condition } => {
                require_in_by(*field, by, "having")?;
                condition.check(field.name(), field.kind(), field.nullable())
            }
            Having::Aggregate {
                function,
                field,
                condition,
            } => {
                function.check_field(*field)?;
                let kind = function.result_kind(field.kind());
                let nullable = *function != AggregateFn::Count;
                condition.check(field.name(), kind, nullable)
            }
            Having::And(parts) | Having::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate(by))
            }
            Having::Not(inner) => inner.validate(by),
        }
    }
}

/// One `orderBy` entry of a groupBy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupOrderBy<F> {
    Field {
        field: F,
        order: SortOrder,
    },
    Aggregate {
        function: AggregateFn,
        field: F,
        order: SortOrder,
    },
}

impl<F: Field> GroupOrderBy<F> {
    pub fn field(field: F, order: SortOrder) -> Self {
        GroupOrderBy::Field { field, order }
    }

    pub fn aggregate(function: AggregateFn, field: F, order: SortOrder) -> Self {
        GroupOrderBy::Aggregate {
            function,
            field,
            order,
        }
    }
}

/// Arguments for `groupBy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "F: Deserialize<'de>"))]
pub struct GroupByArgs<F> {
    pub by: Vec<F>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter<F>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<Having<F>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<GroupOrderBy<F>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(flatten)]
    pub select: AggregateSelect<F>,
}

impl<F: Field> GroupByArgs<F> {
    pub fn new(by: impl IntoIterator<Item = F>) -> Self {
        GroupByArgs {
            by: by.into_iter().collect(),
            filter: None,
            having: None,
            order_by: Vec::new(),
            take: None,
            skip: None,
            select: AggregateSelect::default(),
        }
    }

    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn having(mut self, having: Having<F>) -> Self {
        self.having = Some(having);
        self
    }

    pub fn order_by(mut self, order: GroupOrderBy<F>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn select(mut self, select: AggregateSelect<F>) -> Self {
        self.select = select;
        self
    }

    /// Validates the request before any SQL is built.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.by.is_empty() {
            return Err(ValidationError::Required {
                field: "by".to_string(),
            });
        }

        if let Some(filter) = &self.filter {
            filter.validate()?;
        }

        for order in &self.order_by {
            match order {
                GroupOrderBy::Field { field, .. } => require_in_by(*field, &self.by, "orderBy")?,
                GroupOrderBy::Aggregate {
                    function, field, ..
                } => function.check_field(*field)?,
            }
        }

        if let Some(having) = &self.having {
            having.validate(&self.by)?;
        }

        if (self.take.is_some() || self.skip.is_some()) && self.order_by.is_empty() {
            return Err(ValidationError::Required {
                field: "orderBy (required when using take or skip)".to_string(),
            });
        }

        for (name, value) in [("take", self.take), ("skip", self.skip)] {
            if matches!(value, Some(v) if v < 0) {
                return Err(ValidationError::OutOfRange {
                    field: name.to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }

        self.select.validate()
    }
}

fn require_in_by<F: Field>(field: F, by: &[F], clause: &str) -> ValidationResult<()> {
    if by.contains(&field) {
        Ok(())
    } else {
        Err(ValidationError::FieldNotInBy {
            field: field.name().to_string(),
            clause: clause.to_string(),
        })
    }
}

/// One output row of `groupBy`: the group key plus its aggregates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupByRow {
    #[serde(flatten)]
    pub keys: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub aggregates: AggregateResult,
}

impl GroupByRow {
    /// Group key value for a field, by API name.
    pub fn key(&self, name: &str) -> Option<&Value> {
        self.keys.get(name)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
