//! Aggregate function module for sqlstep
//!
//! This module partitions a working set into groups and computes the
//! aggregate SELECT items for each group. Values are read with numeric
//! coercion (see [`Value::as_number`]): anything non-numeric counts as 0.

use std::collections::{HashMap, HashSet};

use crate::select_item::{Aggregate, AggregateType, SelectColumn};
use crate::table::{Table, TableRow, Value};

/// One group: its key tuple and the positions of its member rows
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Values of the grouped columns, in GROUP BY order
    pub key: Vec<Value>,
    /// Indices of the member rows in the source table
    pub members: Vec<usize>,
}

/// Partition rows by the tuple of their grouped values
///
/// Groups are returned in order of first occurrence. The key is the value
/// tuple itself, so distinct tuples can never collide.
pub fn partition(table: &Table, group_by: &[String]) -> Vec<Group> {
    let key_columns: Vec<Option<usize>> = group_by.iter().map(|c| table.column_index(c)).collect();
    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (i, row) in table.rows().iter().enumerate() {
        let key: Vec<Value> = key_columns
            .iter()
            .map(|idx| idx.map(|idx| row.get(idx).clone()).unwrap_or(Value::Null))
            .collect();

        match index.get(&key) {
            Some(&g) => groups[g].members.push(i),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    members: vec![i],
                });
            }
        }
    }

    groups
}

/// Collapse each group into one row
///
/// Columns are the grouped columns followed by the SELECT display names,
/// without repeats. Non-aggregate SELECT items take the value of the
/// group's first member. Rows get ids `g0, g1, ...`.
pub fn aggregate_groups(
    table: &Table,
    groups: &[Group],
    group_by: &[String],
    select: &[SelectColumn],
) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for name in group_by
        .iter()
        .chain(select.iter().filter(|c| !c.is_wildcard()).map(|c| &c.display_name))
    {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }

    let rows = groups
        .iter()
        .enumerate()
        .map(|(idx, group)| {
            let members: Vec<&TableRow> = group.members.iter().map(|&i| &table.rows()[i]).collect();
            let mut values = vec![Value::Null; columns.len()];

            for (col, key_value) in group_by.iter().zip(&group.key) {
                set_value(&columns, &mut values, col, key_value.clone());
            }
            for item in select.iter().filter(|c| !c.is_wildcard()) {
                let value = select_value(table, &members, item);
                set_value(&columns, &mut values, &item.display_name, value);
            }

            TableRow::new(format!("g{}", idx), values)
        })
        .collect();

    Table::from_parts(table.name(), columns, rows)
}

/// Aggregate the whole working set as one implicit group
///
/// Produces exactly one row, id `agg0`, whose columns are the SELECT
/// display names.
pub fn aggregate_all(table: &Table, select: &[SelectColumn]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for item in select.iter().filter(|c| !c.is_wildcard()) {
        if !columns.contains(&item.display_name) {
            columns.push(item.display_name.clone());
        }
    }

    let members: Vec<&TableRow> = table.rows().iter().collect();
    let mut values = vec![Value::Null; columns.len()];
    for item in select.iter().filter(|c| !c.is_wildcard()) {
        let value = select_value(table, &members, item);
        set_value(&columns, &mut values, &item.display_name, value);
    }

    Table::from_parts(table.name(), columns, vec![TableRow::new("agg0", values)])
}

fn set_value(columns: &[String], values: &mut [Value], column: &str, value: Value) {
    if let Some(pos) = columns.iter().position(|c| c == column) {
        values[pos] = value;
    }
}

/// Value of one SELECT item for a set of member rows
fn select_value(table: &Table, members: &[&TableRow], item: &SelectColumn) -> Value {
    match &item.aggregate {
        Some(aggregate) => compute(table, members, aggregate),
        None => members
            .first()
            .and_then(|row| table.value(row, &item.expression))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

/// Execute one aggregate over the member rows
///
/// An empty set yields 0 for COUNT, DISTINCT_COUNT, SUM and AVG, and NULL
/// for MIN and MAX.
pub fn compute(table: &Table, members: &[&TableRow], aggregate: &Aggregate) -> Value {
    let field_values = || {
        members.iter().map(|row| {
            table
                .value(row, &aggregate.aggregate_field)
                .cloned()
                .unwrap_or(Value::Null)
        })
    };

    match aggregate.aggregate_type {
        AggregateType::Count => Value::Integer(members.len() as i64),
        AggregateType::DistinctCount => {
            let distinct: HashSet<Value> = field_values().collect();
            Value::Integer(distinct.len() as i64)
        }
        AggregateType::Sum => Value::number(field_values().map(|v| v.as_number()).sum()),
        AggregateType::Avg => {
            if members.is_empty() {
                return Value::Integer(0);
            }
            let sum: f64 = field_values().map(|v| v.as_number()).sum();
            Value::number(sum / members.len() as f64)
        }
        AggregateType::Min => field_values()
            .map(|v| v.as_number())
            .reduce(f64::min)
            .map(Value::number)
            .unwrap_or(Value::Null),
        AggregateType::Max => field_values()
            .map(|v| v.as_number())
            .reduce(f64::max)
            .map(Value::number)
            .unwrap_or(Value::Null),
    }
}
