//! # Generic CRUD
//!
//! Entity-agnostic statements shared by every repository. Each function runs
//! on a borrowed connection, which is either a pooled connection or the
//! connection of an open transaction (see [`crate::repository::Source`]).
//!
//! ## Read Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FindManyArgs                                                           │
//! │     │ validate()                     ← ValidationError, no SQL yet      │
//! │     ▼                                                                   │
//! │  ReadPlan                                                               │
//! │     ├── orderBy + id tiebreaker (flipped when take < 0)                 │
//! │     ├── cursor row values       (cursor missing → empty result)         │
//! │     └── LIMIT |take| OFFSET skip (in memory when distinct is set)       │
//! │     ▼                                                                   │
//! │  SELECT * FROM t WHERE filter AND cursor ORDER BY … LIMIT … OFFSET …    │
//! │     ▼                                                                   │
//! │  reverse (take < 0) → distinct → skip/take (distinct only)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use kasir_core::query::{
    validate_assignments, Assignment, BatchPayload, Field, Filter, FindManyArgs, OrderBy,
    Selection, UpdateOp, Value,
};
use kasir_core::{CreateInput, Entity, UniqueWhere, UpdateInput};

use crate::error::{DbError, DbResult};
use crate::sql::{push_cursor, push_filter, push_limit, push_order_by, push_value, quote, with_tiebreaker};

/// An entity that can be read back from a SQLite row.
pub trait Model: Entity + for<'r> FromRow<'r, SqliteRow> {}

impl<M> Model for M where M: Entity + for<'r> FromRow<'r, SqliteRow> {}

pub(crate) type Args<M> = FindManyArgs<<M as Entity>::Field, <M as Entity>::Unique>;

// =============================================================================
// Read Plan
// =============================================================================

/// Ordering, cursor and window of one read, resolved against the database.
pub(crate) struct ReadPlan<F: Field> {
    /// Effective ordering as sent to SQL (flipped when reading backwards).
    pub orders: Vec<OrderBy<F>>,
    /// Cursor row's value for each entry of `orders`.
    pub cursor: Option<Vec<Value>>,
    /// True when `take` was negative.
    pub backwards: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Resolves the ordering and cursor of a read.
///
/// Returns `None` when a cursor is given but no row matches it.
pub(crate) async fn plan<M: Model>(
    conn: &mut SqliteConnection,
    args: &Args<M>,
    paginate_in_sql: bool,
) -> DbResult<Option<ReadPlan<M::Field>>> {
    let backwards = matches!(args.take, Some(t) if t < 0);

    let mut orders = with_tiebreaker(&args.order_by, M::ID);
    if backwards {
        orders = orders.into_iter().map(OrderBy::reversed).collect();
    }

    let cursor = match &args.cursor {
        Some(unique) => match find_unique::<M>(conn, unique).await? {
            Some(row) => Some(orders.iter().map(|o| row.value_of(o.field)).collect()),
            None => {
                debug!(entity = M::NAME, cursor = %unique.describe(), "Cursor row not found");
                return Ok(None);
            }
        },
        None => None,
    };

    let (limit, offset) = if paginate_in_sql {
        (args.take.map(i64::abs), args.skip)
    } else {
        (None, None)
    };

    Ok(Some(ReadPlan {
        orders,
        cursor,
        backwards,
        limit,
        offset,
    }))
}

/// Appends `WHERE … ORDER BY … LIMIT … OFFSET …` for a plan.
pub(crate) fn push_read_tail<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    filter: Option<&Filter<F>>,
    plan: &ReadPlan<F>,
) {
    push_where(qb, filter, plan);
    push_order_by(qb, &plan.orders);
    push_limit(qb, plan.limit, plan.offset);
}

fn push_where<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    filter: Option<&Filter<F>>,
    plan: &ReadPlan<F>,
) {
    match (filter, &plan.cursor) {
        (None, None) => {}
        (Some(filter), None) => {
            qb.push(" WHERE ");
            push_filter(qb, filter);
        }
        (None, Some(cursor)) => {
            qb.push(" WHERE ");
            push_cursor(qb, &plan.orders, cursor);
        }
        (Some(filter), Some(cursor)) => {
            qb.push(" WHERE ");
            push_filter(qb, filter);
            qb.push(" AND ");
            push_cursor(qb, &plan.orders, cursor);
        }
    }
}

fn select_from<M: Entity>() -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!("SELECT * FROM {}", quote(M::TABLE)))
}

// =============================================================================
// Reads
// =============================================================================

pub(crate) async fn find_unique<M: Model>(
    conn: &mut SqliteConnection,
    unique: &M::Unique,
) -> DbResult<Option<M>> {
    let mut qb = select_from::<M>();
    qb.push(" WHERE ");
    push_filter(&mut qb, &unique.to_filter());
    qb.push(" LIMIT 1");

    let row = qb.build_query_as::<M>().fetch_optional(&mut *conn).await?;
    Ok(row)
}

pub(crate) async fn find_many<M: Model>(
    conn: &mut SqliteConnection,
    args: &Args<M>,
) -> DbResult<Vec<M>> {
    args.validate()?;

    let distinct = !args.distinct.is_empty();
    let Some(plan) = plan::<M>(conn, args, !distinct).await? else {
        return Ok(Vec::new());
    };

    let mut qb = select_from::<M>();
    push_read_tail(&mut qb, args.filter.as_ref(), &plan);

    let mut rows = qb.build_query_as::<M>().fetch_all(&mut *conn).await?;
    if plan.backwards {
        rows.reverse();
    }

    if distinct {
        rows = dedupe(rows, &args.distinct);
        rows = window(rows, args.skip, args.take);
    }

    debug!(entity = M::NAME, rows = rows.len(), "find_many");
    Ok(rows)
}

pub(crate) async fn find_first<M: Model>(
    conn: &mut SqliteConnection,
    args: &Args<M>,
) -> DbResult<Option<M>> {
    let mut args = args.clone();
    args.take = Some(match args.take {
        Some(t) if t < 0 => -1,
        _ => 1,
    });
    Ok(find_many::<M>(conn, &args).await?.into_iter().next())
}

pub(crate) async fn count<M: Model>(conn: &mut SqliteConnection, args: &Args<M>) -> DbResult<i64> {
    if !args.distinct.is_empty() {
        return Ok(find_many::<M>(conn, args).await?.len() as i64);
    }
    args.validate()?;

    let Some(plan) = plan::<M>(conn, args, true).await? else {
        return Ok(0);
    };

    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM (SELECT 1 FROM {}", quote(M::TABLE)));
    push_read_tail(&mut qb, args.filter.as_ref(), &plan);
    qb.push(")");

    let n: i64 = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(n)
}

pub(crate) async fn find_many_selected<M: Model>(
    conn: &mut SqliteConnection,
    args: &Args<M>,
    selection: &Selection<M::Field>,
) -> DbResult<Vec<serde_json::Map<String, serde_json::Value>>> {
    find_many::<M>(conn, args)
        .await?
        .iter()
        .map(|row| {
            selection
                .project(row)
                .map_err(|e| DbError::Internal(format!("projecting {}: {e}", M::NAME)))
        })
        .collect()
}

/// Keeps the first row of every distinct combination of `fields`.
fn dedupe<M: Entity>(rows: Vec<M>, fields: &[M::Field]) -> Vec<M> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key: Vec<String> = fields.iter().map(|f| row.value_of(*f).key()).collect();
            seen.insert(key)
        })
        .collect()
}

/// Applies skip/take in memory; a negative take counts from the end.
pub(crate) fn window<T>(rows: Vec<T>, skip: Option<i64>, take: Option<i64>) -> Vec<T> {
    let skip = skip.unwrap_or(0).max(0) as usize;
    match take {
        Some(t) if t < 0 => {
            let mut rows: Vec<T> = rows.into_iter().rev().skip(skip).take(t.unsigned_abs() as usize).collect();
            rows.reverse();
            rows
        }
        Some(t) => rows.into_iter().skip(skip).take(t as usize).collect(),
        None => rows.into_iter().skip(skip).collect(),
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Column values of a create input plus id and timestamps.
fn insert_values<M: Entity>(data: M::Create) -> DbResult<Vec<(M::Field, Value)>> {
    data.validate()?;
    let mut values = data.into_values();

    if !values.iter().any(|(f, _)| *f == M::ID) {
        values.insert(0, (M::ID, Value::Text(Uuid::new_v4().to_string())));
    }
    let now = Utc::now();
    values.push((M::CREATED_AT, now.into()));
    values.push((M::UPDATED_AT, now.into()));

    for (field, value) in &values {
        field.check_value(value)?;
    }
    Ok(values)
}

fn insert_statement<M: Entity>(
    values: &[(M::Field, Value)],
    ignore_conflicts: bool,
) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", quote(M::TABLE)));
    for (i, (field, _)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote(field.column()));
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, value);
    }
    qb.push(")");
    if ignore_conflicts {
        qb.push(" ON CONFLICT DO NOTHING");
    }
    qb
}

pub(crate) async fn create<M: Model>(conn: &mut SqliteConnection, data: M::Create) -> DbResult<M> {
    let values = insert_values::<M>(data)?;
    let mut qb = insert_statement::<M>(&values, false);
    qb.push(" RETURNING *");

    let row = qb.build_query_as::<M>().fetch_one(&mut *conn).await?;
    debug!(entity = M::NAME, id = %row.id(), "Created");
    Ok(row)
}

/// Inserts every row inside one transaction (a savepoint when the
/// connection is already in one).
pub(crate) async fn create_many<M: Model>(
    conn: &mut SqliteConnection,
    data: Vec<M::Create>,
    skip_duplicates: bool,
) -> DbResult<BatchPayload> {
    let rows = data
        .into_iter()
        .map(insert_values::<M>)
        .collect::<DbResult<Vec<_>>>()?;

    let mut tx = conn.begin().await?;
    let mut count = 0;
    for values in &rows {
        let result = insert_statement::<M>(values, skip_duplicates)
            .build()
            .execute(&mut *tx)
            .await?;
        count += result.rows_affected();
    }
    tx.commit().await?;

    debug!(entity = M::NAME, requested = rows.len(), inserted = count, "create_many");
    Ok(BatchPayload::new(count))
}

fn push_assignments<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, assignments: &[Assignment<F>], updated_at: F) {
    qb.push(" SET ");
    for a in assignments {
        let column = quote(a.field.column());
        qb.push(&column);
        qb.push(" = ");
        let op = match a.op {
            UpdateOp::Set => None,
            UpdateOp::Increment => Some(" + "),
            UpdateOp::Decrement => Some(" - "),
            UpdateOp::Multiply => Some(" * "),
            UpdateOp::Divide => Some(" / "),
        };
        if let Some(op) = op {
            qb.push(&column);
            qb.push(op);
        }
        push_value(qb, &a.value);
        qb.push(", ");
    }
    qb.push(quote(updated_at.column()));
    qb.push(" = ");
    push_value(qb, &Value::DateTime(Utc::now()));
}

fn checked_assignments<M: Entity>(data: &M::Update) -> DbResult<Vec<Assignment<M::Field>>> {
    data.validate()?;
    let assignments = data.assignments();
    validate_assignments(&assignments)?;
    Ok(assignments)
}

/// `UPDATE … WHERE filter RETURNING *` for a filter that selects one row.
async fn update_one<M: Model>(
    conn: &mut SqliteConnection,
    filter: &Filter<M::Field>,
    assignments: &[Assignment<M::Field>],
    describe: impl FnOnce() -> String,
) -> DbResult<M> {
    let mut qb = QueryBuilder::new(format!("UPDATE {}", quote(M::TABLE)));
    push_assignments(&mut qb, assignments, M::UPDATED_AT);
    qb.push(" WHERE ");
    push_filter(&mut qb, filter);
    qb.push(" RETURNING *");

    qb.build_query_as::<M>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(M::NAME, describe()))
}

/// Writes the follow-up update that restores derived columns, if the
/// written row needs one.
async fn reconcile<M: Model>(conn: &mut SqliteConnection, row: M, data: &M::Update) -> DbResult<M> {
    let Some(fix) = row.derived_update(data)? else {
        return Ok(row);
    };
    // The fix carries computed values only, so field checks suffice.
    let assignments = fix.assignments();
    validate_assignments(&assignments)?;

    let by_id = Filter::equals(M::ID, row.id());
    let fixed = update_one::<M>(conn, &by_id, &assignments, || format!("id={}", row.id())).await?;
    debug!(entity = M::NAME, id = %fixed.id(), "Derived columns recomputed");
    Ok(fixed)
}

pub(crate) async fn update<M: Model>(
    conn: &mut SqliteConnection,
    unique: &M::Unique,
    data: &M::Update,
) -> DbResult<M> {
    let assignments = checked_assignments::<M>(data)?;

    let mut tx = conn.begin().await?;
    let row = update_one::<M>(&mut *tx, &unique.to_filter(), &assignments, || unique.describe()).await?;
    let row = reconcile::<M>(&mut *tx, row, data).await?;
    tx.commit().await?;

    debug!(entity = M::NAME, id = %row.id(), fields = assignments.len(), "Updated");
    Ok(row)
}

/// Updates every matching row; each written row is reconciled like `update`.
pub(crate) async fn update_many<M: Model>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<M::Field>>,
    data: &M::Update,
) -> DbResult<BatchPayload> {
    if let Some(filter) = filter {
        filter.validate()?;
    }
    let assignments = checked_assignments::<M>(data)?;

    let mut qb = QueryBuilder::new(format!("UPDATE {}", quote(M::TABLE)));
    push_assignments(&mut qb, &assignments, M::UPDATED_AT);
    if let Some(filter) = filter {
        qb.push(" WHERE ");
        push_filter(&mut qb, filter);
    }
    qb.push(" RETURNING *");

    let mut tx = conn.begin().await?;
    let rows = qb.build_query_as::<M>().fetch_all(&mut *tx).await?;
    let count = rows.len() as u64;
    for row in rows {
        reconcile::<M>(&mut *tx, row, data).await?;
    }
    tx.commit().await?;

    debug!(entity = M::NAME, count, "update_many");
    Ok(BatchPayload::new(count))
}

/// Updates the row selected by `unique`, or creates it when absent.
pub(crate) async fn upsert<M: Model>(
    conn: &mut SqliteConnection,
    unique: &M::Unique,
    create_data: M::Create,
    update_data: &M::Update,
) -> DbResult<M> {
    let assignments = checked_assignments::<M>(update_data)?;
    create_data.validate()?;

    let mut tx = conn.begin().await?;
    let row = match find_unique::<M>(&mut *tx, unique).await? {
        Some(existing) => {
            let by_id = Filter::equals(M::ID, existing.id());
            let row = update_one::<M>(&mut *tx, &by_id, &assignments, || unique.describe()).await?;
            reconcile::<M>(&mut *tx, row, update_data).await?
        }
        None => create::<M>(&mut *tx, create_data).await?,
    };
    tx.commit().await?;

    debug!(entity = M::NAME, id = %row.id(), "Upserted");
    Ok(row)
}

pub(crate) async fn delete<M: Model>(conn: &mut SqliteConnection, unique: &M::Unique) -> DbResult<M> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {} WHERE ", quote(M::TABLE)));
    push_filter(&mut qb, &unique.to_filter());
    qb.push(" RETURNING *");

    let row = qb
        .build_query_as::<M>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(M::NAME, unique.describe()))?;
    debug!(entity = M::NAME, id = %row.id(), "Deleted");
    Ok(row)
}

pub(crate) async fn delete_many<M: Model>(
    conn: &mut SqliteConnection,
    filter: Option<&Filter<M::Field>>,
) -> DbResult<BatchPayload> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {}", quote(M::TABLE)));
    if let Some(filter) = filter {
        filter.validate()?;
        qb.push(" WHERE ");
        push_filter(&mut qb, filter);
    }

    let result = qb.build().execute(&mut *conn).await?;
    debug!(entity = M::NAME, count = result.rows_affected(), "delete_many");
    Ok(BatchPayload::new(result.rows_affected()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_negative_take_counts_from_end() {
        let rows = vec![1, 2, 3, 4, 5];
        assert_eq!(window(rows.clone(), Some(1), Some(2)), vec![2, 3]);
        assert_eq!(window(rows.clone(), Some(1), Some(-2)), vec![3, 4]);
        assert_eq!(window(rows, None, None), vec![1, 2, 3, 4, 5]);
    }
}
