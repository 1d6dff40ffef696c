//! Projection, ordering and limiting
//!
//! The last three stages of a SELECT. Each takes the working set by
//! reference and returns a new one; row ids carry through unchanged.

use std::cmp::Ordering;

use crate::parser::OrderByItem;
use crate::select_item::SelectColumn;
use crate::table::{SortDirection, Table, TableRow, Value};

/// Column names a SELECT list produces against a working set
///
/// `*` expands in place to every working column.
pub fn output_columns(table: &Table, select: &[SelectColumn]) -> Vec<String> {
    let mut columns = Vec::new();
    for item in select {
        if item.is_wildcard() {
            columns.extend(table.columns().iter().cloned());
        } else {
            columns.push(item.display_name.clone());
        }
    }
    columns
}

/// Project the working set onto the SELECT list
///
/// Each item is looked up by display name first, then by expression.
/// References that match no column project as NULL.
pub fn project(table: &Table, select: &[SelectColumn]) -> Table {
    let columns = output_columns(table, select);

    let sources: Vec<Vec<Option<usize>>> = select
        .iter()
        .map(|item| {
            if item.is_wildcard() {
                (0..table.column_count()).map(Some).collect()
            } else {
                vec![table
                    .column_index(&item.display_name)
                    .or_else(|| table.column_index(&item.expression))]
            }
        })
        .collect();

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let values = sources
                .iter()
                .flatten()
                .map(|idx| idx.map(|i| row.get(i).clone()).unwrap_or(Value::Null))
                .collect();
            TableRow::new(row.id.clone(), values)
        })
        .collect();

    Table::from_parts(table.name(), columns, rows)
}

/// Column an ORDER BY key sorts on
///
/// A SELECT alias wins (case-insensitive). A key that is not a column of
/// the set may still name an item by display name. Otherwise the key is
/// used as written.
fn sort_column(table: &Table, key: &str, select: &[SelectColumn]) -> Option<usize> {
    let aliased = select.iter().find(|item| {
        item.alias
            .as_deref()
            .map_or(false, |alias| alias.eq_ignore_ascii_case(key))
    });
    if let Some(item) = aliased {
        return table.column_index(&item.display_name);
    }

    if table.column_index(key).is_none() {
        if let Some(item) = select
            .iter()
            .find(|item| item.display_name.eq_ignore_ascii_case(key))
        {
            return table.column_index(&item.display_name);
        }
    }

    table.column_index(key)
}

/// Compare two sort values: numbers numerically, anything else as text
fn compare_values(a: &Value, b: &Value) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => a
            .as_number()
            .partial_cmp(&b.as_number())
            .unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Stable multi-key sort of the working set
pub fn sort_rows(table: &Table, order_by: &[OrderByItem], select: &[SelectColumn]) -> Table {
    let keys: Vec<(Option<usize>, SortDirection)> = order_by
        .iter()
        .map(|item| (sort_column(table, &item.column, select), item.direction))
        .collect();

    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| {
        for (idx, direction) in &keys {
            let ordering = match idx {
                Some(i) => compare_values(a.get(*i), b.get(*i)),
                None => Ordering::Equal,
            };
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Table::from_parts(table.name(), table.columns().to_vec(), rows)
}

/// Keep the first `limit` rows
pub fn limit_rows(table: &Table, limit: usize) -> Table {
    let rows = table.rows().iter().take(limit).cloned().collect();
    Table::from_parts(table.name(), table.columns().to_vec(), rows)
}
