//! # Aggregates and GroupBy
//!
//! ## Statement Shapes
//! ```text
//! aggregate:
//!   SELECT COUNT(*) AS a0, SUM("total_amount") AS a1
//!   FROM (SELECT * FROM "transactions" WHERE … ORDER BY … LIMIT …)
//!
//! groupBy:
//!   SELECT "store_id", SUM("total_amount") AS a0
//!   FROM "transactions" WHERE …
//!   GROUP BY "store_id"
//!   HAVING SUM("total_amount") > ?
//!   ORDER BY SUM("total_amount") DESC
//!   LIMIT ? OFFSET ?
//! ```
//!
//! Arguments are validated in kasir-core before any of this runs; a groupBy
//! that orders by a field outside `by` never reaches SQLite.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::debug;

use kasir_core::query::{
    AggregateArgs, AggregateExpr, AggregateFn, AggregateResult, AggregateSelect, CountResult,
    CountSelect, Field, FieldKind, Filter, FindManyArgs, GroupByArgs, GroupByRow, GroupOrderBy,
    Having, Value,
};

use crate::crud::{plan, push_read_tail, Model};
use crate::error::{DbError, DbResult};
use crate::sql::{direction, push_condition, push_filter, push_limit, quote};

fn expr_sql<F: Field>(function: AggregateFn, field: Option<F>) -> String {
    match field {
        Some(f) => format!("{}({})", function.sql(), quote(f.column())),
        None => format!("{}(*)", function.sql()),
    }
}

fn push_select_list<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, exprs: &[AggregateExpr<F>], first: bool) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 || !first {
            qb.push(", ");
        }
        qb.push(expr_sql(expr.function, expr.field));
        qb.push(format!(" AS a{i}"));
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Reads column `idx` as a value of the given kind. SQL NULL becomes
/// [`Value::Null`].
pub(crate) fn decode_value(row: &SqliteRow, idx: usize, kind: FieldKind) -> DbResult<Value> {
    let value = match kind {
        FieldKind::Int => row.try_get_unchecked::<Option<i64>, _>(idx)?.into(),
        FieldKind::Float => row.try_get_unchecked::<Option<f64>, _>(idx)?.into(),
        FieldKind::Bool => row
            .try_get_unchecked::<Option<i64>, _>(idx)?
            .map(|v| v != 0)
            .into(),
        FieldKind::DateTime => match row.try_get_unchecked::<Option<String>, _>(idx)? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| DbError::Internal(format!("bad timestamp '{raw}': {e}")))?;
                Value::DateTime(parsed.with_timezone(&Utc))
            }
            None => Value::Null,
        },
        FieldKind::Text | FieldKind::Enum(_) => {
            row.try_get_unchecked::<Option<String>, _>(idx)?.into()
        }
    };
    Ok(value)
}

fn decode_aggregate<F: Field>(row: &SqliteRow, idx: usize, expr: &AggregateExpr<F>) -> DbResult<Value> {
    match (expr.function, expr.field) {
        (AggregateFn::Count, _) => Ok(Value::Int(row.try_get_unchecked::<i64, _>(idx)?)),
        (AggregateFn::Avg, _) => Ok(row.try_get_unchecked::<Option<f64>, _>(idx)?.into()),
        (function, Some(field)) => decode_value(row, idx, function.result_kind(field.kind())),
        (_, None) => Ok(Value::Null),
    }
}

fn record_all<F: Field>(
    result: &mut AggregateResult,
    row: &SqliteRow,
    exprs: &[AggregateExpr<F>],
    offset: usize,
) -> DbResult<()> {
    for (i, expr) in exprs.iter().enumerate() {
        let value = decode_aggregate(row, offset + i, expr)?;
        result.record(expr.function, expr.field.map(|f| f.name()), value);
    }
    Ok(())
}

/// Aggregates over an empty set: counts are 0, everything else null.
fn empty_result<F: Field>(exprs: &[AggregateExpr<F>]) -> AggregateResult {
    let mut result = AggregateResult::default();
    for expr in exprs {
        let value = match expr.function {
            AggregateFn::Count => Value::Int(0),
            _ => Value::Null,
        };
        result.record(expr.function, expr.field.map(|f| f.name()), value);
    }
    result
}

// =============================================================================
// aggregate
// =============================================================================

pub(crate) async fn aggregate<M: Model>(
    conn: &mut SqliteConnection,
    args: &AggregateArgs<M::Field, M::Unique>,
) -> DbResult<AggregateResult> {
    args.validate()?;

    let exprs = args.select.expressions();
    if exprs.is_empty() {
        return Ok(AggregateResult::default());
    }

    let Some(plan) = plan::<M>(conn, &args.find, true).await? else {
        return Ok(empty_result(&exprs));
    };

    let mut qb = QueryBuilder::new("SELECT ");
    push_select_list(&mut qb, &exprs, true);
    qb.push(format!(" FROM (SELECT * FROM {}", quote(M::TABLE)));
    push_read_tail(&mut qb, args.find.filter.as_ref(), &plan);
    qb.push(")");

    let row = qb.build().fetch_one(&mut *conn).await?;

    let mut result = AggregateResult::default();
    record_all(&mut result, &row, &exprs, 0)?;

    debug!(entity = M::NAME, expressions = exprs.len(), "aggregate");
    Ok(result)
}

/// `_count` only: `_all` and per-field non-null counts.
pub(crate) async fn count_fields<M: Model>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<M::Field>>,
    select: &CountSelect<M::Field>,
) -> DbResult<CountResult> {
    let args = AggregateArgs {
        find: FindManyArgs {
            filter: filter.cloned(),
            ..FindManyArgs::default()
        },
        select: AggregateSelect::new().count(select.clone()),
    };
    let result = aggregate::<M>(conn, &args).await?;
    Ok(result.count.unwrap_or_default())
}

// =============================================================================
// groupBy
// =============================================================================

fn push_having<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, having: &Having<F>) {
    match having {
        Having::Field { field, condition } => push_condition(qb, &quote(field.column()), condition),
        Having::Aggregate {
            function,
            field,
            condition,
        } => push_condition(qb, &expr_sql(*function, Some(*field)), condition),
        Having::And(parts) => push_having_junction(qb, parts, " AND ", "1 = 1"),
        Having::Or(parts) => push_having_junction(qb, parts, " OR ", "1 = 0"),
        Having::Not(inner) => {
            qb.push("NOT (");
            push_having(qb, inner);
            qb.push(")");
        }
    }
}

fn push_having_junction<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    parts: &[Having<F>],
    joiner: &str,
    empty: &str,
) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(joiner);
        }
        push_having(qb, part);
    }
    qb.push(")");
}

fn push_group_order<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, args: &GroupByArgs<F>) {
    qb.push(" ORDER BY ");
    if args.order_by.is_empty() {
        // Deterministic output: group keys ascending.
        for (i, field) in args.by.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(quote(field.column()));
        }
        return;
    }
    for (i, order) in args.order_by.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        match order {
            GroupOrderBy::Field { field, order } => {
                qb.push(quote(field.column()));
                qb.push(direction(*order));
            }
            GroupOrderBy::Aggregate {
                function,
                field,
                order,
            } => {
                qb.push(expr_sql(*function, Some(*field)));
                qb.push(direction(*order));
            }
        }
    }
}

pub(crate) async fn group_by<M: Model>(
    conn: &mut SqliteConnection,
    args: &GroupByArgs<M::Field>,
) -> DbResult<Vec<GroupByRow>> {
    args.validate()?;

    let exprs = args.select.expressions();
    let keys = args
        .by
        .iter()
        .map(|f| quote(f.column()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut qb = QueryBuilder::new(format!("SELECT {keys}"));
    push_select_list(&mut qb, &exprs, false);
    qb.push(format!(" FROM {}", quote(M::TABLE)));
    if let Some(filter) = &args.filter {
        qb.push(" WHERE ");
        push_filter(&mut qb, filter);
    }
    qb.push(format!(" GROUP BY {keys}"));
    if let Some(having) = &args.having {
        qb.push(" HAVING ");
        push_having(&mut qb, having);
    }
    push_group_order(&mut qb, args);
    push_limit(&mut qb, args.take, args.skip);

    let rows = qb.build().fetch_all(&mut *conn).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut group = GroupByRow::default();
        for (i, field) in args.by.iter().enumerate() {
            group
                .keys
                .insert(field.name().to_string(), decode_value(row, i, field.kind())?);
        }
        record_all(&mut group.aggregates, row, &exprs, args.by.len())?;
        out.push(group);
    }

    debug!(entity = M::NAME, groups = out.len(), "group_by");
    Ok(out)
}

// =============================================================================
// Unit Tests
// =============================================================================
