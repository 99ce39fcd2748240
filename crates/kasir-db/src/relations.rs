//! # Relation Loading
//!
//! Foreign-key scoped reads shared by the entity repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lazy      children(fk, parent.id, args)                                │
//! │            SELECT * FROM child WHERE (args.where) AND fk = ?  …paging   │
//! │                                                                         │
//! │  batch     children_by_parent(fk, [id1, id2, …], args)                  │
//! │            SELECT * FROM child WHERE (args.where) AND fk IN (?, ?, …)   │
//! │            ORDER BY … ─► grouped per parent ─► skip/take per parent     │
//! │                                                                         │
//! │  count     count_children(fk, parent.id)                                │
//! │            SELECT COUNT(*) … WHERE fk = ?                               │
//! │                                                                         │
//! │  to-one    parent(id)        required FK, missing row is NotFound       │
//! │            optional_parent   nullable FK                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A page of parents costs one query per relation, never one per parent.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use tracing::debug;

use kasir_core::query::filter::and_optional;
use kasir_core::query::{Filter, FindManyArgs};
use kasir_core::{Entity, ValidationError};

use crate::crud::{self, window, Args, Model};
use crate::error::{DbError, DbResult};

/// Rows of `C` whose `fk` equals `parent_id`, narrowed and paged by `args`.
pub(crate) async fn children<C: Model>(
    conn: &mut SqliteConnection,
    fk: C::Field,
    parent_id: &str,
    args: &Args<C>,
) -> DbResult<Vec<C>> {
    let scoped = args.clone().and_where(Filter::equals(fk, parent_id));
    crud::find_many::<C>(conn, &scoped).await
}

/// Number of `C` rows pointing at `parent_id`.
pub(crate) async fn count_children<C: Model>(
    conn: &mut SqliteConnection,
    fk: C::Field,
    parent_id: &str,
) -> DbResult<i64> {
    let args = Args::<C>::new().filter(Filter::equals(fk, parent_id));
    crud::count::<C>(conn, &args).await
}

/// Loads the children of many parents with a single `IN (…)` query.
///
/// `args.where` and `args.orderBy` apply to the whole scan; `skip`/`take`
/// apply per parent. Every id in `parent_ids` gets an entry, possibly empty.
///
/// ## Errors
/// - `UnsupportedOperation` for `cursor` or `distinct`, which have no
///   per-parent meaning
pub(crate) async fn children_by_parent<C: Model>(
    conn: &mut SqliteConnection,
    fk: C::Field,
    parent_ids: &[String],
    args: &Args<C>,
) -> DbResult<HashMap<String, Vec<C>>> {
    for (set, name) in [(args.cursor.is_some(), "cursor"), (!args.distinct.is_empty(), "distinct")] {
        if set {
            return Err(ValidationError::UnsupportedOperation {
                field: name.to_string(),
                operation: "batch relation loading".to_string(),
            }
            .into());
        }
    }

    args.validate()?;

    let mut grouped: HashMap<String, Vec<C>> = parent_ids
        .iter()
        .map(|id| (id.clone(), Vec::new()))
        .collect();
    if parent_ids.is_empty() {
        return Ok(grouped);
    }

    let scan = FindManyArgs {
        filter: Some(and_optional(
            args.filter.clone(),
            Filter::is_in(fk, parent_ids.iter().cloned()),
        )),
        order_by: args.order_by.clone(),
        ..FindManyArgs::default()
    };
    let rows = crud::find_many::<C>(conn, &scan).await?;
    let total = rows.len();
    for row in rows {
        if let Some(key) = row.value_of(fk).as_str() {
            if let Some(bucket) = grouped.get_mut(key) {
                bucket.push(row);
            }
        }
    }

    if args.skip.is_some() || args.take.is_some() {
        for bucket in grouped.values_mut() {
            *bucket = window(std::mem::take(bucket), args.skip, args.take);
        }
    }

    debug!(entity = C::NAME, parents = parent_ids.len(), rows = total, "Batch loaded relation");
    Ok(grouped)
}

/// The row of `P` with primary key `id`; a dangling reference is `NotFound`.
pub(crate) async fn parent<P: Model>(conn: &mut SqliteConnection, id: &str) -> DbResult<P> {
    optional_parent::<P>(conn, Some(id))
        .await?
        .ok_or_else(|| DbError::not_found(P::NAME, format!("id={id}")))
}

/// Like [`parent`] for a nullable foreign key.
pub(crate) async fn optional_parent<P: Model>(
    conn: &mut SqliteConnection,
    id: Option<&str>,
) -> DbResult<Option<P>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let args = Args::<P>::new().filter(Filter::equals(P::ID, id));
    crud::find_first::<P>(conn, &args).await
}

/// Primary keys of a page of rows, in order.
pub(crate) fn ids<M: Entity>(rows: &[M]) -> Vec<String> {
    rows.iter().map(|row| row.id().to_string()).collect()
}
