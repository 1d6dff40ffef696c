//! Join module for the sqlstep simulator
//!
//! This module implements the nested-loop equality join. A single join
//! produces four snapshots: the scanned left side, the scanned right side,
//! the matching step (counts only) and the built result.

use tracing::debug;

use crate::parser::Join;
use crate::snapshot::{ExecutionSnapshot, LogicalStep, SnapshotMetadata};
use crate::table::{Table, TableRow, Value};

/// Output of one join: the new working set and its four snapshots
#[derive(Debug)]
pub struct JoinOutcome {
    /// The joined working set
    pub table: Table,
    /// Scan-left, scan-right, match and build snapshots, in that order
    pub snapshots: Vec<ExecutionSnapshot>,
}

/// Executor for join operations
///
/// Left-side columns are renamed after the query's FROM table, right-side
/// columns after the joined table.
#[derive(Debug)]
pub struct JoinExecutor<'a> {
    from_table: &'a str,
}

impl<'a> JoinExecutor<'a> {
    /// Create a join executor for a query whose FROM table is `from_table`
    pub fn new(from_table: &'a str) -> Self {
        JoinExecutor { from_table }
    }

    /// Join the current working set with `right`
    ///
    /// # Arguments
    /// * `left` - The current working set
    /// * `right` - The table named by the JOIN clause
    /// * `join` - The parsed JOIN clause
    pub fn execute_join(&self, left: &Table, right: &Table, join: &Join) -> JoinOutcome {
        let mut snapshots = Vec::with_capacity(4);

        snapshots.push(ExecutionSnapshot::capture(
            LogicalStep::JoinScanLeft,
            "JOIN: Scan Left Table",
            format!(
                "Scan the left table '{}'. Each row will be compared against the right table '{}'.",
                self.from_table, join.table
            ),
            left,
            SnapshotMetadata {
                join_left_table: Some(self.from_table.to_string()),
                ..SnapshotMetadata::new(left.row_count(), format!("FROM {}", self.from_table))
            },
        ));

        snapshots.push(ExecutionSnapshot::capture(
            LogicalStep::JoinScanRight,
            "JOIN: Scan Right Table",
            format!(
                "Scan the right table '{}'. Each row will be checked against the left \
                 table's condition.",
                join.table
            ),
            right,
            SnapshotMetadata {
                join_right_table: Some(join.table.clone()),
                ..SnapshotMetadata::new(right.row_count(), format!("JOIN {}", join.table))
            },
        ));

        let matches = self.find_matches(left, right, join);
        let type_title = format!("{} JOIN", join.join_type);

        snapshots.push(ExecutionSnapshot {
            step: LogicalStep::JoinMatch,
            title: format!("{}: Match Condition", type_title),
            description: format!(
                "Find rows where {}. Found {} matching pairs.",
                join.condition,
                matches.pairs.len()
            ),
            columns: Vec::new(),
            rows: Vec::new(),
            metadata: SnapshotMetadata {
                match_count: Some(matches.pairs.len()),
                join_type: Some(join.join_type),
                join_left_table: Some(self.from_table.to_string()),
                join_right_table: Some(join.table.clone()),
                ..SnapshotMetadata::new(matches.pairs.len(), format!("ON {}", join.condition))
            },
        });

        let table = self.build_rows(left, right, join, &matches);
        let unmatched_count = table.rows().iter().filter(|r| r.unmatched).count();

        snapshots.push(ExecutionSnapshot::capture(
            LogicalStep::JoinBuild,
            format!("{}: Result", type_title),
            format!(
                "Result set of the {} join. Matched rows: {}, unmatched rows: {}. Total rows: {}.",
                join.join_type.to_string().to_lowercase(),
                matches.pairs.len(),
                unmatched_count,
                table.row_count()
            ),
            &table,
            SnapshotMetadata {
                match_count: Some(matches.pairs.len()),
                unmatched_count: Some(unmatched_count),
                join_type: Some(join.join_type),
                join_left_table: Some(self.from_table.to_string()),
                join_right_table: Some(join.table.clone()),
                ..SnapshotMetadata::new(table.row_count(), format!("{} {}", type_title, join.table))
            },
        ));

        debug!(
            "{} {}: {} matches, {} unmatched, {} rows",
            type_title,
            join.table,
            matches.pairs.len(),
            unmatched_count,
            table.row_count()
        );

        JoinOutcome { table, snapshots }
    }

    /// Nested-loop scan for every (left, right) pair with equal keys
    fn find_matches(&self, left: &Table, right: &Table, join: &Join) -> Matches {
        let mut matches = Matches {
            pairs: Vec::new(),
            left_matched: vec![false; left.row_count()],
            right_matched: vec![false; right.row_count()],
        };

        let (left_idx, right_idx) = match self.key_columns(left, right, join) {
            Some(keys) => keys,
            None => {
                debug!(
                    "JOIN {}: cannot resolve condition {}, nothing matches",
                    join.table, join.condition
                );
                return matches;
            }
        };

        for (li, left_row) in left.rows().iter().enumerate() {
            for (ri, right_row) in right.rows().iter().enumerate() {
                if left_row.get(left_idx) == right_row.get(right_idx) {
                    matches.pairs.push((li, ri));
                    matches.left_matched[li] = true;
                    matches.right_matched[ri] = true;
                }
            }
        }

        matches
    }

    /// Column positions of the join keys on each side
    ///
    /// A condition written with the joined table first is read the other
    /// way round.
    fn key_columns(&self, left: &Table, right: &Table, join: &Join) -> Option<(usize, usize)> {
        let cond = &join.condition;
        let (left_table, left_column, right_column) =
            if cond.left_table == join.table && cond.right_table != join.table {
                (&cond.right_table, &cond.right_column, &cond.left_column)
            } else {
                (&cond.left_table, &cond.left_column, &cond.right_column)
            };

        let left_idx = left
            .column_index(&format!("{}.{}", left_table, left_column))
            .or_else(|| left.column_index(left_column))?;
        let right_idx = right.column_index(right_column)?;
        Some((left_idx, right_idx))
    }

    /// Build the joined working set from the match pairs
    fn build_rows(&self, left: &Table, right: &Table, join: &Join, matches: &Matches) -> Table {
        let columns = joined_columns(self.from_table, left, &join.table, right);
        let left_nulls = vec![Value::Null; left.column_count()];
        let right_nulls = vec![Value::Null; right.column_count()];
        let mut rows = Vec::new();

        let mut push = |left_values: &[Value], right_values: &[Value], unmatched: bool| {
            let id = format!("j{}", rows.len());
            let mut row = TableRow::new(id, combine_rows(left_values, right_values));
            row.unmatched = unmatched;
            rows.push(row);
        };

        for &(li, ri) in &matches.pairs {
            push(&left.rows()[li].values, &right.rows()[ri].values, false);
        }

        if join.join_type.keeps_left() {
            for (li, left_row) in left.rows().iter().enumerate() {
                if !matches.left_matched[li] {
                    push(&left_row.values, &right_nulls, true);
                }
            }
        }

        if join.join_type.keeps_right() {
            for (ri, right_row) in right.rows().iter().enumerate() {
                if !matches.right_matched[ri] {
                    push(&left_nulls, &right_row.values, true);
                }
            }
        }

        Table::from_parts(self.from_table, columns, rows)
    }
}

/// Matching pairs plus which rows on each side found a partner
#[derive(Debug)]
struct Matches {
    pairs: Vec<(usize, usize)>,
    left_matched: Vec<bool>,
    right_matched: Vec<bool>,
}

/// Left columns prefixed with the FROM table, then right columns prefixed
/// with the joined table
fn joined_columns(left_name: &str, left: &Table, right_name: &str, right: &Table) -> Vec<String> {
    let mut columns = Vec::with_capacity(left.column_count() + right.column_count());
    add_prefixed_columns(&mut columns, left_name, left.columns());
    add_prefixed_columns(&mut columns, right_name, right.columns());
    columns
}

fn add_prefixed_columns(columns: &mut Vec<String>, prefix: &str, source: &[String]) {
    for col in source {
        columns.push(format!("{}.{}", prefix, col));
    }
}

fn combine_rows(left_values: &[Value], right_values: &[Value]) -> Vec<Value> {
    let mut new_row = Vec::with_capacity(left_values.len() + right_values.len());
    new_row.extend_from_slice(left_values);
    new_row.extend_from_slice(right_values);
    new_row
}
