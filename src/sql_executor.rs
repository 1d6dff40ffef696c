//! SQL execution module for sqlstep
//!
//! This module runs a parsed SELECT through its logical stages in order
//! (FROM, JOIN, WHERE, GROUP BY, HAVING, SELECT, ORDER BY, LIMIT) and
//! records a snapshot after each one. Stages for absent clauses are skipped.

use regex::Regex;
use tracing::debug;

use crate::aggregate;
use crate::database::Database;
use crate::error::StepResult;
use crate::join::JoinExecutor;
use crate::parser::{parse_query, QueryComponents};
use crate::predicate::evaluate_condition;
use crate::projection;
use crate::snapshot::{ExecutionSnapshot, LogicalStep, SnapshotMetadata};
use crate::table::Table;

/// Parse `query` and run it against `tables`
///
/// Returns one snapshot per executed stage. Fails without producing any
/// snapshots when the query cannot be parsed or names a missing table.
pub fn run(query: &str, tables: &Database) -> StepResult<Vec<ExecutionSnapshot>> {
    SqlExecutor::new(tables).execute(query)
}

/// SQL statement executor
pub struct SqlExecutor<'a> {
    /// Catalog the query's tables are resolved against
    database: &'a Database,
}

impl<'a> SqlExecutor<'a> {
    /// Create an executor over a table catalog
    pub fn new(database: &'a Database) -> Self {
        SqlExecutor { database }
    }

    /// Parse and execute a SELECT statement
    pub fn execute(&self, sql: &str) -> StepResult<Vec<ExecutionSnapshot>> {
        let query = parse_query(sql)?;
        self.execute_query(&query)
    }

    /// Execute an already-parsed query
    pub fn execute_query(&self, query: &QueryComponents) -> StepResult<Vec<ExecutionSnapshot>> {
        // Resolve every table up front so a bad name fails before any stage runs
        let source = self.database.get_table(&query.from)?;
        let join_tables = query
            .joins
            .iter()
            .map(|join| self.database.get_table(&join.table))
            .collect::<StepResult<Vec<&Table>>>()?;

        let mut steps = Vec::new();

        steps.push(ExecutionSnapshot::capture(
            LogicalStep::From,
            "FROM",
            format!(
                "Load the rows of table '{}'. Every later stage starts from this set.",
                source.name()
            ),
            source,
            SnapshotMetadata::new(source.row_count(), format!("FROM {}", query.from)),
        ));
        debug!("FROM {}: {} rows", query.from, source.row_count());

        let mut working = source.clone();

        if !query.joins.is_empty() {
            let joiner = JoinExecutor::new(&query.from);
            for (join, right) in query.joins.iter().zip(join_tables) {
                let outcome = joiner.execute_join(&working, right, join);
                steps.extend(outcome.snapshots);
                working = outcome.table;
            }
        }

        if let Some(predicate) = &query.where_clause {
            working = self.filter_stage(
                &mut steps,
                working,
                predicate,
                predicate,
                LogicalStep::Where,
                format!(
                    "Filter rows on \"{}\". Rows that fail the condition are marked for removal.",
                    predicate
                ),
            );
        }

        let grouped = query.group_by.is_some() || query.has_aggregates();
        if grouped {
            working = self.group_stage(&mut steps, &working, query);
        }

        if let (Some(having), true) = (&query.having, grouped) {
            let predicate = rewrite_aggregate_aliases(having, query);
            working = self.filter_stage(
                &mut steps,
                working,
                having,
                &predicate,
                LogicalStep::Having,
                format!(
                    "Filter groups on \"{}\". This happens after grouping.",
                    having
                ),
            );
        }

        let projected = projection::project(&working, &query.select);
        let select_names: Vec<&str> = query
            .select
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        steps.push(ExecutionSnapshot::capture(
            LogicalStep::Select,
            "SELECT",
            format!(
                "Project the final set of columns: {}.",
                projected.columns().join(", ")
            ),
            &projected,
            SnapshotMetadata::new(
                projected.row_count(),
                format!("SELECT {}", select_names.join(", ")),
            ),
        ));
        debug!("SELECT: {} columns", projected.column_count());
        working = projected;

        if let Some(order_by) = &query.order_by {
            working = projection::sort_rows(&working, order_by, &query.select);
            let keys: Vec<String> = order_by.iter().map(|item| item.to_string()).collect();
            steps.push(ExecutionSnapshot::capture(
                LogicalStep::OrderBy,
                "ORDER BY",
                format!("Sort the result. Logical order: {}.", keys.join(", ")),
                &working,
                SnapshotMetadata::new(working.row_count(), format!("ORDER BY {}", keys.join(", "))),
            ));
            debug!("ORDER BY {}", keys.join(", "));
        }

        if let Some(limit) = query.limit {
            working = projection::limit_rows(&working, limit);
            steps.push(ExecutionSnapshot::capture(
                LogicalStep::Limit,
                "LIMIT",
                format!("Keep only the first {} rows of the result.", limit),
                &working,
                SnapshotMetadata::new(working.row_count(), format!("LIMIT {}", limit)),
            ));
            debug!("LIMIT {}: {} rows remain", limit, working.row_count());
        }

        Ok(steps)
    }

    /// Mark rows failing `predicate`, snapshot them, and return the survivors
    ///
    /// `clause` is the condition as written in the query and only labels the
    /// snapshot.
    fn filter_stage(
        &self,
        steps: &mut Vec<ExecutionSnapshot>,
        table: Table,
        clause: &str,
        predicate: &str,
        step: LogicalStep,
        description: String,
    ) -> Table {
        let name = table.name().to_string();
        let columns = table.columns().to_vec();
        let mut rows = table.into_rows();
        for row in rows.iter_mut() {
            row.excluded = !evaluate_condition(&columns, row, predicate);
        }

        let marked = Table::from_parts(&name, columns, rows);
        let kept = marked.rows().iter().filter(|r| !r.excluded).count();
        let title = step.to_string().replace('_', " ");
        steps.push(ExecutionSnapshot::capture(
            step,
            title.clone(),
            description,
            &marked,
            SnapshotMetadata::new(kept, format!("{} {}", title, clause)),
        ));
        debug!("{}: {} of {} rows kept", step, kept, marked.row_count());

        let columns = marked.columns().to_vec();
        let survivors = marked
            .into_rows()
            .into_iter()
            .filter(|r| !r.excluded)
            .collect();
        Table::from_parts(&name, columns, survivors)
    }

    /// Run the grouping stage, explicit or implicit
    fn group_stage(
        &self,
        steps: &mut Vec<ExecutionSnapshot>,
        table: &Table,
        query: &QueryComponents,
    ) -> Table {
        match &query.group_by {
            Some(group_by) => {
                let groups = aggregate::partition(table, group_by);
                let keys = group_by.join(", ");
                steps.push(ExecutionSnapshot::capture(
                    LogicalStep::GroupBy,
                    "GROUP BY",
                    format!(
                        "Group {} rows into {} groups by: {}.",
                        table.row_count(),
                        groups.len(),
                        keys
                    ),
                    table,
                    SnapshotMetadata {
                        group_count: Some(groups.len()),
                        ..SnapshotMetadata::new(table.row_count(), format!("GROUP BY {}", keys))
                    },
                ));
                debug!("GROUP BY {}: {} groups", keys, groups.len());
                aggregate::aggregate_groups(table, &groups, group_by, &query.select)
            }
            None => {
                let result = aggregate::aggregate_all(table, &query.select);
                let expressions: Vec<&str> = query
                    .select
                    .iter()
                    .filter(|c| c.is_aggregate())
                    .map(|c| c.expression.as_str())
                    .collect();
                steps.push(ExecutionSnapshot::capture(
                    LogicalStep::GroupBy,
                    "AGGREGATE",
                    format!(
                        "Compute the aggregate functions over all {} rows.",
                        table.row_count()
                    ),
                    &result,
                    SnapshotMetadata {
                        group_count: Some(1),
                        ..SnapshotMetadata::new(
                            1,
                            format!("Aggregates: {}", expressions.join(", ")),
                        )
                    },
                ));
                debug!("AGGREGATE over {} rows", table.row_count());
                result
            }
        }
    }
}

/// Point aggregate calls in a HAVING predicate at their SELECT aliases
///
/// `HAVING COUNT(*) > 1` with `COUNT(*) AS total` in the SELECT list becomes
/// `total > 1`, since the grouped row only carries the alias.
fn rewrite_aggregate_aliases(having: &str, query: &QueryComponents) -> String {
    let mut predicate = having.to_string();
    for item in query.select.iter().filter(|c| c.is_aggregate()) {
        let Some(alias) = &item.alias else { continue };
        if let Ok(re) = Regex::new(&call_pattern(&item.expression)) {
            predicate = re.replace_all(&predicate, alias.as_str()).into_owned();
        }
    }
    predicate
}

/// Case-insensitive pattern for an aggregate call that tolerates whitespace
/// around punctuation, so `COUNT(*)` also matches `count( * )`
fn call_pattern(expression: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::from("(?i)");
    let mut prev: Option<char> = None;
    let mut spaced = false;
    for c in expression.chars() {
        if c.is_whitespace() {
            spaced = true;
            continue;
        }
        if let Some(p) = prev {
            if is_word(p) && is_word(c) {
                if spaced {
                    pattern.push_str(r"\s+");
                }
            } else {
                pattern.push_str(r"\s*");
            }
        }
        pattern.push_str(&regex::escape(&c.to_string()));
        prev = Some(c);
        spaced = false;
    }
    pattern
}
