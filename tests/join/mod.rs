//! Join tests
//!
//! `orders` has 21 rows: 20 belong to users 1-15 and one to the missing
//! user 99. Users 5, 8 and 13 have no orders.

use sqlstep::parser::JoinType;
use sqlstep::snapshot::LogicalStep;
use sqlstep::table::Value;

use crate::helpers::*;

const ON: &str = "FROM users {} JOIN orders ON users.id = orders.user_id";

fn join_query(kind: &str) -> String {
    format!("SELECT users.name, orders.product {}", ON.replace("{}", kind))
}

#[test]
fn test_join_emits_four_stages_in_order() {
    let snapshots = run_sample(&join_query("INNER"));
    assert_eq!(
        steps(&snapshots),
        vec![
            LogicalStep::From,
            LogicalStep::JoinScanLeft,
            LogicalStep::JoinScanRight,
            LogicalStep::JoinMatch,
            LogicalStep::JoinBuild,
            LogicalStep::Select,
        ]
    );

    let left = find(&snapshots, LogicalStep::JoinScanLeft);
    assert_eq!(left.rows.len(), 15);
    assert_eq!(left.metadata.highlighted_clause, "FROM users");
    assert_eq!(left.metadata.join_left_table.as_deref(), Some("users"));

    let right = find(&snapshots, LogicalStep::JoinScanRight);
    assert_eq!(right.rows.len(), 21);
    assert_eq!(right.metadata.highlighted_clause, "JOIN orders");

    let matched = find(&snapshots, LogicalStep::JoinMatch);
    assert!(matched.rows.is_empty());
    assert!(matched.columns.is_empty());
    assert_eq!(matched.metadata.match_count, Some(20));
    assert_eq!(matched.metadata.join_type, Some(JoinType::Inner));
    assert_eq!(
        matched.metadata.highlighted_clause,
        "ON users.id = orders.user_id"
    );
}

#[test]
fn test_inner_join_cardinality() {
    let snapshots = run_sample(&join_query("INNER"));
    let built = find(&snapshots, LogicalStep::JoinBuild);
    assert_eq!(built.rows.len(), 20);
    assert_eq!(built.metadata.unmatched_count, Some(0));
    assert_eq!(built.metadata.highlighted_clause, "INNER JOIN orders");
    assert!(built.rows.iter().all(|r| !r.unmatched));
    assert_eq!(built.columns[0], "users.id");
    assert_eq!(built.columns[6], "orders.order_id");
    // Left-major order: Alice's four orders come first
    assert_eq!(
        column(built, "orders.product")[..4],
        [text("Laptop"), text("Monitor"), text("Chair"), text("Gaming Mouse")]
    );
    assert_eq!(ids(built)[..3], ["j0", "j1", "j2"]);
}

#[test]
fn test_left_join_pads_unmatched_users() {
    let snapshots = run_sample(&join_query("LEFT"));
    let built = find(&snapshots, LogicalStep::JoinBuild);
    assert_eq!(built.rows.len(), 23);
    assert_eq!(built.metadata.unmatched_count, Some(3));

    let unmatched: Vec<_> = built.rows.iter().filter(|r| r.unmatched).collect();
    let names: Vec<Value> = unmatched
        .iter()
        .map(|r| built.value(r, "users.name").cloned().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![text("Eve Davis"), text("Henry Taylor"), text("Mia Thomas")]
    );
    assert!(unmatched
        .iter()
        .all(|r| built.value(r, "orders.product") == Some(&Value::Null)));
}

#[test]
fn test_right_join_keeps_orphan_order() {
    let snapshots = run_sample(&join_query("RIGHT"));
    let built = find(&snapshots, LogicalStep::JoinBuild);
    assert_eq!(built.rows.len(), 21);
    let orphan = built.rows.iter().find(|r| r.unmatched).unwrap();
    assert_eq!(built.value(orphan, "orders.user_id"), Some(&Value::Integer(99)));
    assert_eq!(built.value(orphan, "users.name"), Some(&Value::Null));
}

#[test]
fn test_full_join_keeps_both_sides() {
    let snapshots = run_sample(&join_query("FULL OUTER"));
    let built = find(&snapshots, LogicalStep::JoinBuild);
    assert_eq!(built.rows.len(), 24);
    assert_eq!(built.metadata.unmatched_count, Some(4));
    assert_eq!(built.title, "FULL JOIN: Result");
}

#[test]
fn test_projection_after_join_uses_qualified_names() {
    let snapshots = run_sample(&join_query("INNER"));
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(select.columns, vec!["users.name", "orders.product"]);
    assert_eq!(select.rows[0].values, vec![text("Alice Johnson"), text("Laptop")]);
}

#[test]
fn test_where_on_joined_columns() {
    let snapshots = run_sample(
        "SELECT users.name, orders.amount FROM users INNER JOIN orders \
         ON users.id = orders.user_id WHERE orders.amount > 500",
    );
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(
        column(select, "users.name"),
        vec![text("Alice Johnson"), text("Bob Smith"), text("Grace Lee")]
    );
}

#[test]
fn test_reversed_condition_matches_the_same_rows() {
    let forward = run_sample(&join_query("INNER"));
    let reversed = run_sample(
        "SELECT users.name, orders.product FROM users \
         INNER JOIN orders ON orders.user_id = users.id",
    );
    assert_eq!(
        find(&forward, LogicalStep::JoinBuild).rows,
        find(&reversed, LogicalStep::JoinBuild).rows
    );
}

#[test]
fn test_chained_joins() {
    let snapshots = run_sample(
        "SELECT users.name, departments.dept_name FROM users \
         JOIN orders ON users.id = orders.user_id \
         JOIN departments ON users.id = departments.manager_id",
    );
    assert_eq!(snapshots.len(), 1 + 4 + 4 + 1);

    let builds: Vec<_> = snapshots
        .iter()
        .filter(|s| s.step == LogicalStep::JoinBuild)
        .collect();
    assert_eq!(builds.len(), 2);
    // Managers 1, 3, 6, 7, 10 and 12 have 4, 2, 2, 2, 1 and 1 orders
    assert_eq!(builds[1].rows.len(), 12);
    assert_eq!(builds[1].columns[0], "users.users.id");

    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(select.rows[0].values, vec![text("Alice Johnson"), text("Engineering")]);
}

#[test]
fn test_unknown_join_table_is_fatal() {
    let err = sqlstep::run(
        "SELECT * FROM users JOIN invoices ON users.id = invoices.user_id",
        &sample(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("invoices"));
}
