//! GROUP BY, aggregate and HAVING tests

use sqlstep::snapshot::LogicalStep;
use sqlstep::table::Value;

use crate::helpers::*;

#[test]
fn test_count_star_over_orders() {
    let snapshots = run_sample("SELECT COUNT(*) FROM orders");
    assert_eq!(
        steps(&snapshots),
        vec![LogicalStep::From, LogicalStep::GroupBy, LogicalStep::Select]
    );

    let aggregate = find(&snapshots, LogicalStep::GroupBy);
    assert_eq!(aggregate.title, "AGGREGATE");
    assert_eq!(aggregate.metadata.group_count, Some(1));
    assert_eq!(aggregate.metadata.highlighted_clause, "Aggregates: COUNT(*)");
    assert_eq!(ids(aggregate), vec!["agg0"]);

    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(select.columns, vec!["COUNT(*)"]);
    assert_eq!(select.rows.len(), 1);
    assert_eq!(select.rows[0].values, vec![Value::Integer(21)]);
}

#[test]
fn test_group_stage_shows_pre_group_rows() {
    let snapshots = run_sample("SELECT country, COUNT(*) AS n FROM users GROUP BY country");
    let group = find(&snapshots, LogicalStep::GroupBy);
    assert_eq!(group.title, "GROUP BY");
    assert_eq!(group.rows.len(), 15);
    assert_eq!(group.metadata.row_count, 15);
    assert_eq!(group.metadata.group_count, Some(8));
    assert_eq!(group.metadata.highlighted_clause, "GROUP BY country");

    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(select.columns, vec!["country", "n"]);
    // Groups appear in order of first occurrence
    assert_eq!(
        column(select, "country")[..4],
        [text("USA"), text("UK"), text("Canada"), text("Germany")]
    );
    assert_eq!(
        column(select, "n")[..4],
        [Value::Integer(4), Value::Integer(3), Value::Integer(2), Value::Integer(2)]
    );
    assert_eq!(ids(select)[..3], ["g0", "g1", "g2"]);
}

#[test]
fn test_having_excludes_single_member_groups() {
    let snapshots = run_sample(
        "SELECT country, COUNT(*) as user_count FROM users GROUP BY country \
         HAVING user_count > 1 ORDER BY user_count DESC",
    );
    let having = find(&snapshots, LogicalStep::Having);
    assert_eq!(having.rows.len(), 8);
    assert_eq!(having.metadata.row_count, 4);
    assert_eq!(having.metadata.highlighted_clause, "HAVING user_count > 1");
    for row in &having.rows {
        let count = having.value(row, "user_count").unwrap().as_number();
        assert_eq!(row.excluded, count <= 1.0, "{}", row.id);
    }

    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(
        column(ordered, "country"),
        vec![text("USA"), text("UK"), text("Canada"), text("Germany")]
    );
}

#[test]
fn test_having_with_aggregate_call() {
    let snapshots = run_sample(
        "SELECT country, COUNT(*) AS n FROM users GROUP BY country HAVING COUNT(*) >= 3",
    );
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(column(select, "country"), vec![text("USA"), text("UK")]);
}

#[test]
fn test_having_with_spaced_aggregate_call() {
    let snapshots = run_sample(
        "SELECT country, COUNT(*) AS n FROM users GROUP BY country HAVING COUNT( * ) > 1",
    );
    let having = find(&snapshots, LogicalStep::Having);
    assert_eq!(having.metadata.row_count, 4);
    assert_eq!(having.metadata.highlighted_clause, "HAVING COUNT( * ) > 1");
}

#[test]
fn test_sum_by_category_after_where() {
    let snapshots = run_sample(
        "SELECT category, SUM(amount) as total_sales FROM sales WHERE amount > 100 \
         GROUP BY category ORDER BY total_sales DESC",
    );
    assert_eq!(
        steps(&snapshots),
        vec![
            LogicalStep::From,
            LogicalStep::Where,
            LogicalStep::GroupBy,
            LogicalStep::Select,
            LogicalStep::OrderBy,
        ]
    );
    assert_eq!(find(&snapshots, LogicalStep::GroupBy).rows.len(), 11);

    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(
        column(ordered, "category"),
        vec![text("Electronics"), text("Furniture")]
    );
    assert_eq!(
        column(ordered, "total_sales"),
        vec![Value::Integer(3550), Value::Integer(1050)]
    );
}

#[test]
fn test_multi_column_groups_sorted() {
    let snapshots = run_sample(
        "SELECT region, quarter, SUM(amount) as quarterly_sales FROM sales \
         GROUP BY region, quarter ORDER BY region, quarter",
    );
    assert_eq!(find(&snapshots, LogicalStep::GroupBy).metadata.group_count, Some(14));

    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(ordered.rows.len(), 14);
    assert_eq!(
        ordered.rows[0].values,
        vec![text("East"), text("Q2"), Value::Integer(200)]
    );
    assert_eq!(
        ordered.rows[3].values,
        vec![text("North"), text("Q1"), Value::Integer(1350)]
    );
}

#[test]
fn test_avg_min_max_without_group_by() {
    let snapshots = run_sample(
        "SELECT AVG(age) AS avg_age, MIN(age) AS youngest, MAX(age) AS oldest, \
         COUNT(DISTINCT country) AS countries FROM users",
    );
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(
        select.rows[0].values,
        vec![
            Value::Float(448.0 / 15.0),
            Value::Integer(22),
            Value::Integer(45),
            Value::Integer(8),
        ]
    );
}

#[test]
fn test_aggregates_over_empty_input() {
    let snapshots = run_sample(
        "SELECT COUNT(*) AS n, SUM(age) AS s, MIN(age) AS lo FROM users WHERE age > 100",
    );
    let select = find(&snapshots, LogicalStep::Select);
    assert_eq!(
        select.rows[0].values,
        vec![Value::Integer(0), Value::Integer(0), Value::Null]
    );
}

#[test]
fn test_group_by_after_left_join() {
    let snapshots = run_sample(
        "SELECT users.name, COUNT(orders.order_id) as order_count FROM users \
         LEFT JOIN orders ON users.id = orders.user_id GROUP BY users.name \
         ORDER BY order_count DESC",
    );
    let ordered = find(&snapshots, LogicalStep::OrderBy);
    assert_eq!(ordered.rows.len(), 15);
    assert_eq!(ordered.rows[0].values, vec![text("Alice Johnson"), Value::Integer(4)]);
}

#[test]
fn test_group_by_on_empty_input() {
    let snapshots =
        run_sample("SELECT country, COUNT(*) FROM users WHERE age > 100 GROUP BY country");
    let group = find(&snapshots, LogicalStep::GroupBy);
    assert_eq!(group.metadata.group_count, Some(0));
    let select = find(&snapshots, LogicalStep::Select);
    assert!(select.rows.is_empty());
    assert_eq!(select.columns, vec!["country", "COUNT(*)"]);
}
