//! Test helpers for sqlstep pipeline tests

use sqlstep::database::Database;
use sqlstep::sample::sample_database;
use sqlstep::snapshot::{ExecutionSnapshot, LogicalStep};
use sqlstep::table::Value;

/// The built-in sample catalog
pub fn sample() -> Database {
    sample_database().expect("sample tables build")
}

/// Run a query against the sample tables
pub fn run_sample(sql: &str) -> Vec<ExecutionSnapshot> {
    sqlstep::run(sql, &sample()).unwrap_or_else(|e| panic!("{sql}: {e}"))
}

/// Stage tags in order
pub fn steps(snapshots: &[ExecutionSnapshot]) -> Vec<LogicalStep> {
    snapshots.iter().map(|s| s.step).collect()
}

/// The first snapshot for a stage
pub fn find(snapshots: &[ExecutionSnapshot], step: LogicalStep) -> &ExecutionSnapshot {
    snapshots
        .iter()
        .find(|s| s.step == step)
        .unwrap_or_else(|| panic!("no {step} snapshot"))
}

/// Row ids of a snapshot
pub fn ids(snapshot: &ExecutionSnapshot) -> Vec<&str> {
    snapshot.rows.iter().map(|r| r.id.as_str()).collect()
}

/// Every value of one column in a snapshot
pub fn column(snapshot: &ExecutionSnapshot, name: &str) -> Vec<Value> {
    snapshot
        .rows
        .iter()
        .map(|r| snapshot.value(r, name).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Shorthand for a string value
pub fn text(s: &str) -> Value {
    Value::String(s.to_string())
}
