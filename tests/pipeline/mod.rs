//! Stage sequencing, filtering, ordering and row lineage

use sqlstep::error::StepError;
use sqlstep::snapshot::LogicalStep;
use sqlstep::table::Value;

use crate::helpers::*;

#[test]
fn test_where_marks_excluded_rows() {
    let snapshots = run_sample("SELECT name, age, country FROM users WHERE age > 25");
    assert_eq!(
        steps(&snapshots),
        vec![LogicalStep::From, LogicalStep::Where, LogicalStep::Select]
    );

    let filtered = find(&snapshots, LogicalStep::Where);
    assert_eq!(filtered.rows.len(), 15);
    assert_eq!(filtered.metadata.row_count, 11);
    assert_eq!(filtered.metadata.highlighted_clause, "WHERE age > 25");
    for row in &filtered.rows {
        let age = filtered.value(row, "age").unwrap().as_number();
        assert_eq!(row.excluded, age <= 25.0, "{}", row.id);
    }
    let excluded: Vec<&str> = filtered
        .rows
        .iter()
        .filter(|r| r.excluded)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(excluded, vec!["u1", "u3", "u9", "u15"]);

    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(select.columns, vec!["name", "age", "country"]);
    assert_eq!(select.rows.len(), 11);
    assert!(select.rows.iter().all(|r| !r.excluded));
}

#[test]
fn test_where_with_boolean_and_or() {
    let snapshots = run_sample(
        "SELECT name FROM users WHERE active = false OR country = 'Japan' AND age < 30",
    );
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(
        column(select, "name"),
        vec![
            text("Bob Smith"),
            text("Grace Lee"),
            text("Henry Taylor"),
            text("Mia Thomas"),
        ]
    );
}

#[test]
fn test_stage_presence_follows_clauses() {
    let snapshots = run_sample(
        "SELECT country, COUNT(*) AS n FROM users WHERE active = true \
         GROUP BY country HAVING n > 1 ORDER BY n DESC LIMIT 2",
    );
    assert_eq!(
        steps(&snapshots),
        vec![
            LogicalStep::From,
            LogicalStep::Where,
            LogicalStep::GroupBy,
            LogicalStep::Having,
            LogicalStep::Select,
            LogicalStep::OrderBy,
            LogicalStep::Limit,
        ]
    );
    let limited = find(&snapshots, LogicalStep::Limit);
    assert_eq!(limited.rows.len(), 2);
    assert_eq!(limited.metadata.highlighted_clause, "LIMIT 2");
}

#[test]
fn test_having_without_grouping_has_no_stage() {
    let snapshots = run_sample("SELECT name FROM users HAVING age > 1");
    assert_eq!(
        steps(&snapshots),
        vec![LogicalStep::From, LogicalStep::Select]
    );
}

#[test]
fn test_order_by_is_stable_and_multi_key() {
    let snapshots = run_sample(
        "SELECT name, country FROM users WHERE active = true ORDER BY name ASC",
    );
    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(ordered.rows.len(), 12);
    assert_eq!(ordered.metadata.highlighted_clause, "ORDER BY name ASC");
    assert_eq!(ids(ordered)[..3], ["u1", "u3", "u4"]);

    let snapshots = run_sample("SELECT name, country, age FROM users ORDER BY country DESC, age");
    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(
        ordered.metadata.highlighted_clause,
        "ORDER BY country DESC, age ASC"
    );
    // USA first, youngest first within it
    assert_eq!(ids(ordered)[..4], ["u3", "u1", "u12", "u8"]);
}

#[test]
fn test_numeric_order_is_not_lexicographic() {
    let snapshots = run_sample("SELECT product, amount FROM orders ORDER BY amount LIMIT 3");
    let limited = find(&snapshots, LogicalStep::Limit);
    assert_eq!(
        column(limited, "amount"),
        vec![Value::Integer(25), Value::Integer(45), Value::Integer(55)]
    );
}

#[test]
fn test_row_ids_trace_through_every_stage() {
    let snapshots = run_sample(
        "SELECT name, age FROM users WHERE age > 25 ORDER BY age DESC LIMIT 3",
    );
    let filtered = find(&snapshots, LogicalStep::Where);
    let select = find(&snapshots, LogicalStep::Select);
    let ordered = find(&snapshots, LogicalStep::OrderBy);
    let limited = find(&snapshots, LogicalStep::Limit);

    let survivors: Vec<&str> = filtered.included_rows().map(|r| r.id.as_str()).collect();
    assert_eq!(ids(select), survivors);

    let mut sorted = ids(ordered);
    sorted.sort();
    let mut selected = ids(select);
    selected.sort();
    assert_eq!(sorted, selected);

    assert_eq!(ids(limited), vec!["u8", "u10", "u4"]);
    assert_eq!(ids(limited), ids(ordered)[..3]);
}

#[test]
fn test_select_star_and_unknown_columns() {
    let snapshots = run_sample("SELECT * FROM departments LIMIT 1");
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(
        select.columns,
        vec!["dept_id", "dept_name", "manager_id", "location", "budget"]
    );
    assert_eq!(select.rows.len(), 7);
    assert_eq!(select.metadata.highlighted_clause, "SELECT *");

    let snapshots = run_sample("SELECT dept_name, nonexistent FROM departments");
    let select = find(&snapshots, LogicalStep::Select);
    assert!(select.rows.iter().all(|r| r.values[1] == Value::Null));
}

#[test]
fn test_runs_are_deterministic() {
    let sql = "SELECT users.name, COUNT(orders.order_id) AS n FROM users \
               LEFT JOIN orders ON users.id = orders.user_id GROUP BY users.name \
               HAVING n > 1 ORDER BY n DESC, users.name LIMIT 5";
    assert_eq!(run_sample(sql), run_sample(sql));
}

#[test]
fn test_emitted_snapshots_are_independent() {
    let snapshots = run_sample("SELECT name FROM users WHERE age > 30");
    let from = find(&snapshots, LogicalStep::From);
    assert_eq!(from.rows.len(), 15);
    assert!(from.rows.iter().all(|r| !r.excluded));
    assert_eq!(from.columns.len(), 6);
}

#[test]
fn test_bad_predicate_excludes_every_row() {
    let snapshots = run_sample("SELECT name FROM users WHERE age >");
    let filtered = find(&snapshots, LogicalStep::Where);
    assert_eq!(filtered.metadata.row_count, 0);
    assert!(find(&snapshots, LogicalStep::Select).rows.is_empty());
}

#[test]
fn test_errors() {
    let db = sample();
    assert!(matches!(
        sqlstep::run("DELETE FROM users", &db),
        Err(StepError::Parse(_))
    ));
    assert!(matches!(
        sqlstep::run("SELECT * FROM missing", &db),
        Err(StepError::TableNotFound(_))
    ));
}

#[test]
fn test_json_shape() {
    let snapshots = run_sample("SELECT name FROM users WHERE age > 40");
    let json = serde_json::to_value(&snapshots).unwrap();
    assert_eq!(json[1]["step"], "WHERE");
    assert_eq!(json[1]["metadata"]["rowCount"], 1);
    assert_eq!(json[1]["metadata"]["highlightedClause"], "WHERE age > 40");
    assert_eq!(json[1]["rows"][0]["excluded"], true);
    assert_eq!(json[2]["rows"][0]["id"], "u8");
    assert_eq!(json[2]["rows"][0]["values"][0], "Henry Taylor");
}
