//! Execution snapshots
//!
//! A snapshot is the immutable record of the working set after one logical
//! stage. Snapshots own their rows, so nothing a later stage does can
//! change one that was already emitted; a consumer stepping back and forth
//! through a run only ever indexes into the returned list.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::error::StepResult;
use crate::parser::JoinType;
use crate::table::{Table, TableRow, Value};

/// Logical stages of a SELECT, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalStep {
    From,
    JoinScanLeft,
    JoinScanRight,
    JoinMatch,
    JoinBuild,
    Where,
    GroupBy,
    Having,
    Select,
    OrderBy,
    Limit,
}

impl fmt::Display for LogicalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            LogicalStep::From => "FROM",
            LogicalStep::JoinScanLeft => "JOIN_SCAN_LEFT",
            LogicalStep::JoinScanRight => "JOIN_SCAN_RIGHT",
            LogicalStep::JoinMatch => "JOIN_MATCH",
            LogicalStep::JoinBuild => "JOIN_BUILD",
            LogicalStep::Where => "WHERE",
            LogicalStep::GroupBy => "GROUP_BY",
            LogicalStep::Having => "HAVING",
            LogicalStep::Select => "SELECT",
            LogicalStep::OrderBy => "ORDER_BY",
            LogicalStep::Limit => "LIMIT",
        };
        f.write_str(tag)
    }
}

/// Counts and labels attached to a snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Rows that are part of the stage's result
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    /// The part of the query this stage corresponds to
    pub highlighted_clause: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_left_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_right_table: Option<String>,
}

impl SnapshotMetadata {
    /// Metadata with just a row count and clause
    pub fn new(row_count: usize, highlighted_clause: impl Into<String>) -> Self {
        SnapshotMetadata {
            row_count,
            highlighted_clause: highlighted_clause.into(),
            ..Default::default()
        }
    }
}

/// The state of the working set after one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSnapshot {
    pub step: LogicalStep,
    pub title: String,
    pub description: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub metadata: SnapshotMetadata,
}

impl ExecutionSnapshot {
    /// Capture a copy of a table or working set
    pub fn capture(
        step: LogicalStep,
        title: impl Into<String>,
        description: impl Into<String>,
        table: &Table,
        metadata: SnapshotMetadata,
    ) -> Self {
        ExecutionSnapshot {
            step,
            title: title.into(),
            description: description.into(),
            columns: table.columns().to_vec(),
            rows: table.rows().to_vec(),
            metadata,
        }
    }

    /// Rows that were not excluded by a predicate
    pub fn included_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| !r.excluded)
    }

    /// Value of a named column in one of this snapshot's rows
    pub fn value<'a>(&self, row: &'a TableRow, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| row.get(idx))
    }

    /// Write the snapshot as a header line followed by comma-delimited rows
    ///
    /// Each row is prefixed by its id; excluded rows are marked with `-` and
    /// outer-join padding rows with `~`.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "== {} [{}]: {}", self.title, self.step, self.description)?;
        writeln!(
            out,
            "   clause: {} | rows: {}",
            self.metadata.highlighted_clause, self.metadata.row_count
        )?;

        if self.columns.is_empty() {
            return Ok(());
        }

        writeln!(out, "_id,{}", self.columns.join(","))?;
        for row in &self.rows {
            let marker = if row.excluded {
                "-"
            } else if row.unmatched {
                "~"
            } else {
                ""
            };
            let values: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}{},{}", marker, row.id, values.join(","))?;
        }
        Ok(())
    }
}

/// Write a snapshot list as a pretty-printed JSON array
pub fn write_json<W: Write>(out: &mut W, snapshots: &[ExecutionSnapshot]) -> StepResult<()> {
    serde_json::to_writer_pretty(&mut *out, snapshots)?;
    writeln!(out)?;
    Ok(())
}
