//! # SQL Rendering
//!
//! Turns validated query arguments from kasir-core into SQL fragments on a
//! `sqlx::QueryBuilder`. Every operand is bound; only identifiers coming from
//! the `Field` metadata are spliced into the statement text.
//!
//! ```text
//! Filter::and([storeId = ?, OR [name LIKE ?, stock <= ?]])
//!     │
//!     ▼
//! ("store_id" = ? AND ("name" LIKE ? ESCAPE '\' OR "stock" <= ?))
//! ```

use sqlx::{QueryBuilder, Sqlite};

use kasir_core::query::{
    format_timestamp, Condition, Field, Filter, NullsOrder, OrderBy, SortOrder, Value,
};

/// Quotes an identifier. Identifiers only ever come from `Field::column()`
/// and `Entity::TABLE`.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Binds a value, rendering NULL as a literal.
pub(crate) fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(v) => {
            qb.push_bind(*v);
        }
        Value::Int(v) => {
            qb.push_bind(*v);
        }
        Value::Float(v) => {
            qb.push_bind(*v);
        }
        Value::DateTime(v) => {
            qb.push_bind(format_timestamp(v));
        }
        Value::Text(v) => {
            qb.push_bind(v.clone());
        }
    }
}

/// Escapes `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_like(qb: &mut QueryBuilder<'_, Sqlite>, lhs: &str, pattern: String) {
    qb.push(lhs);
    qb.push(" LIKE ");
    qb.push_bind(pattern);
    qb.push(" ESCAPE '\\'");
}

fn push_compare(qb: &mut QueryBuilder<'_, Sqlite>, lhs: &str, op: &str, value: &Value) {
    qb.push(lhs);
    qb.push(op);
    push_value(qb, value);
}

fn push_list(qb: &mut QueryBuilder<'_, Sqlite>, values: &[Value]) {
    qb.push("(");
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, v);
    }
    qb.push(")");
}

/// Renders `<lhs> <condition>`. `lhs` is a quoted column or an aggregate
/// expression such as `SUM("total_amount")`.
pub(crate) fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, lhs: &str, condition: &Condition) {
    match condition {
        Condition::Equals(Value::Null) | Condition::IsNull => {
            qb.push(lhs);
            qb.push(" IS NULL");
        }
        Condition::Not(Value::Null) | Condition::IsNotNull => {
            qb.push(lhs);
            qb.push(" IS NOT NULL");
        }
        Condition::Equals(v) => push_compare(qb, lhs, " = ", v),
        Condition::Not(v) => push_compare(qb, lhs, " <> ", v),
        Condition::Lt(v) => push_compare(qb, lhs, " < ", v),
        Condition::Lte(v) => push_compare(qb, lhs, " <= ", v),
        Condition::Gt(v) => push_compare(qb, lhs, " > ", v),
        Condition::Gte(v) => push_compare(qb, lhs, " >= ", v),
        Condition::In(values) if values.is_empty() => {
            qb.push("1 = 0");
        }
        Condition::NotIn(values) if values.is_empty() => {
            qb.push("1 = 1");
        }
        Condition::In(values) => {
            qb.push(lhs);
            qb.push(" IN ");
            push_list(qb, values);
        }
        Condition::NotIn(values) => {
            qb.push(lhs);
            qb.push(" NOT IN ");
            push_list(qb, values);
        }
        Condition::Contains(s) => push_like(qb, lhs, format!("%{}%", escape_like(s))),
        Condition::StartsWith(s) => push_like(qb, lhs, format!("{}%", escape_like(s))),
        Condition::EndsWith(s) => push_like(qb, lhs, format!("%{}", escape_like(s))),
    }
}

/// Renders a filter tree. Empty AND is true, empty OR is false.
pub(crate) fn push_filter<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter<F>) {
    match filter {
        Filter::Field { field, condition } => {
            push_condition(qb, &quote(field.column()), condition);
        }
        Filter::And(parts) => push_junction(qb, parts, " AND ", "1 = 1"),
        Filter::Or(parts) => push_junction(qb, parts, " OR ", "1 = 0"),
        Filter::Not(inner) => {
            qb.push("NOT (");
            push_filter(qb, inner);
            qb.push(")");
        }
    }
}

fn push_junction<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    parts: &[Filter<F>],
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
        push_filter(qb, part);
    }
    qb.push(")");
}

// =============================================================================
// Ordering and Pagination
// =============================================================================

/// The requested ordering plus the primary key as a final tiebreaker.
pub(crate) fn with_tiebreaker<F: Field>(orders: &[OrderBy<F>], id: F) -> Vec<OrderBy<F>> {
    let mut out = orders.to_vec();
    if !out.iter().any(|o| o.field == id) {
        out.push(OrderBy::asc(id));
    }
    out
}

pub(crate) fn push_order_by<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, orders: &[OrderBy<F>]) {
    if orders.is_empty() {
        return;
    }
    qb.push(" ORDER BY ");
    for (i, order) in orders.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote(order.field.column()));
        qb.push(direction(order.order));
        match order.nulls {
            Some(NullsOrder::First) => {
                qb.push(" NULLS FIRST");
            }
            Some(NullsOrder::Last) => {
                qb.push(" NULLS LAST");
            }
            None => {}
        }
    }
}

pub(crate) fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => " ASC",
        SortOrder::Desc => " DESC",
    }
}

/// `LIMIT ? OFFSET ?`; SQLite needs a LIMIT before OFFSET, `-1` means none.
pub(crate) fn push_limit(qb: &mut QueryBuilder<'_, Sqlite>, limit: Option<i64>, offset: Option<i64>) {
    match (limit, offset) {
        (None, None) => {}
        (Some(limit), None) => {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        (limit, Some(offset)) => {
            qb.push(" LIMIT ");
            qb.push_bind(limit.unwrap_or(-1));
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }
    }
}

/// Whether NULLs sort before other values for this ordering.
///
/// SQLite treats NULL as the smallest value when no placement is given.
fn nulls_sort_first<F>(order: &OrderBy<F>) -> bool {
    match order.nulls {
        Some(NullsOrder::First) => true,
        Some(NullsOrder::Last) => false,
        None => order.order == SortOrder::Asc,
    }
}

/// Rows at or after the cursor row in the given ordering.
///
/// `cursor` holds the cursor row's value for each ordering, in order. The
/// predicate is the lexicographic expansion
/// `(k1 after) OR (k1 = c1 AND k2 after) OR … OR (all keys equal)` with
/// NULL-safe equality and the NULL placement of each key taken into account.
pub(crate) fn push_cursor<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    orders: &[OrderBy<F>],
    cursor: &[Value],
) {
    qb.push("(");
    for k in 0..=orders.len() {
        if k > 0 {
            qb.push(" OR ");
        }
        qb.push("(");
        for (i, (order, value)) in orders.iter().zip(cursor).take(k).enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            qb.push(quote(order.field.column()));
            qb.push(" IS ");
            push_value(qb, value);
        }
        if k < orders.len() {
            if k > 0 {
                qb.push(" AND ");
            }
            push_after(qb, &orders[k], &cursor[k]);
        }
        qb.push(")");
    }
    qb.push(")");
}

fn push_after<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, order: &OrderBy<F>, value: &Value) {
    let column = quote(order.field.column());
    let nulls_first = nulls_sort_first(order);

    if value.is_null() {
        if nulls_first {
            qb.push(column);
            qb.push(" IS NOT NULL");
        } else {
            qb.push("1 = 0");
        }
        return;
    }

    let op = match order.order {
        SortOrder::Asc => " > ",
        SortOrder::Desc => " < ",
    };
    qb.push("(");
    qb.push(&column);
    qb.push(op);
    push_value(qb, value);
    if !nulls_first {
        qb.push(" OR ");
        qb.push(&column);
        qb.push(" IS NULL");
    }
    qb.push(")");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::ProductField;

    fn render(f: impl FnOnce(&mut QueryBuilder<'_, Sqlite>)) -> String {
        let mut qb = QueryBuilder::new("");
        f(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_combinators() {
        let and = render(|qb| push_filter::<ProductField>(qb, &Filter::And(vec![])));
        let or = render(|qb| push_filter::<ProductField>(qb, &Filter::Or(vec![])));
        assert_eq!(and, "1 = 1");
        assert_eq!(or, "1 = 0");

        let in_empty = render(|qb| push_condition(qb, "\"id\"", &Condition::In(vec![])));
        let not_in_empty = render(|qb| push_condition(qb, "\"id\"", &Condition::NotIn(vec![])));
        assert_eq!(in_empty, "1 = 0");
        assert_eq!(not_in_empty, "1 = 1");
    }

    #[test]
    fn test_like_escaping() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        let sql = render(|qb| {
            push_condition(qb, "\"name\"", &Condition::StartsWith("kopi".into()))
        });
        assert_eq!(sql, "\"name\" LIKE ? ESCAPE '\\'");
    }

    #[test]
    fn test_null_equality_renders_is_null() {
        let sql = render(|qb| push_filter(qb, &Filter::equals(ProductField::Image, Value::Null)));
        assert_eq!(sql, "\"image\" IS NULL");
        let sql = render(|qb| {
            push_filter(
                qb,
                &Filter::field(ProductField::Image, Condition::Not(Value::Null)),
            )
        });
        assert_eq!(sql, "\"image\" IS NOT NULL");
    }

    #[test]
    fn test_tiebreaker_appended_once() {
        let orders = with_tiebreaker(&[OrderBy::desc(ProductField::Price)], ProductField::Id);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1], OrderBy::asc(ProductField::Id));

        let orders = with_tiebreaker(&[OrderBy::desc(ProductField::Id)], ProductField::Id);
        assert_eq!(orders.len(), 1);
    }

    #[test]
    fn test_skip_without_take() {
        let sql = render(|qb| push_limit(qb, None, Some(5)));
        assert_eq!(sql, " LIMIT ? OFFSET ?");
    }

    #[test]
    fn test_cursor_expansion() {
        let orders = [OrderBy::asc(ProductField::Price), OrderBy::asc(ProductField::Id)];
        let sql = render(|qb| push_cursor(qb, &orders, &[Value::Int(10), Value::from("p1")]));
        assert_eq!(
            sql,
            "(((\"price\" > ?)) OR (\"price\" IS ? AND (\"id\" > ?)) \
             OR (\"price\" IS ? AND \"id\" IS ?))"
        );
    }

    #[test]
    fn test_cursor_on_null_with_nulls_last() {
        let orders = [OrderBy::desc(ProductField::Image)];
        let sql = render(|qb| push_cursor(qb, &orders, &[Value::Null]));
        assert_eq!(sql, "((1 = 0) OR (\"image\" IS NULL))");
    }
}
