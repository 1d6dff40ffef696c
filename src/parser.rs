//! Query parser for sqlstep
//!
//! A best-effort clause scanner for single SELECT statements. It does not
//! build a token stream: after whitespace normalization, each clause is
//! located by a case-insensitive keyword search and runs until the next
//! recognized keyword. Predicate text (WHERE, HAVING) is passed through
//! untouched for the predicate evaluator.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{StepError, StepResult};
use crate::select_item::{classify_select_item, SelectColumn};
use crate::table::SortDirection;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSELECT\s+(.*?)\s+FROM\b").expect("valid SELECT regex"));

static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+(\w+)").expect("valid FROM regex"));

static JOIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:(INNER|LEFT|RIGHT|FULL)\s+)?(?:OUTER\s+)?JOIN\s+(\w+)",
        r"(?:\s+ON\s+(\S+)\s*=\s*(\S+))?",
    ))
    .expect("valid JOIN regex")
});

static OPERAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\w+)\.)?(\w+)$").expect("valid operand regex"));

static WHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\s+").expect("valid WHERE regex"));

static GROUP_BY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bGROUP\s+BY\s+").expect("valid GROUP BY regex"));

static HAVING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bHAVING\s+").expect("valid HAVING regex"));

static ORDER_BY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORDER\s+BY\s+").expect("valid ORDER BY regex"));

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)\b").expect("valid LIMIT regex"));

/// Keywords that end a WHERE clause
static WHERE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:GROUP\s+BY|HAVING|ORDER\s+BY|LIMIT)\b").expect("valid WHERE end regex")
});

/// Keywords that end a GROUP BY clause
static GROUP_BY_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:HAVING|ORDER\s+BY|LIMIT)\b").expect("valid GROUP BY end regex")
});

/// Keywords that end a HAVING clause
static HAVING_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:ORDER\s+BY|LIMIT)\b").expect("valid HAVING end regex")
});

/// Keywords that end an ORDER BY clause
static ORDER_BY_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+LIMIT\b").expect("valid ORDER BY end regex"));

/// Join types supported by sqlstep
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    /// Inner join - returns rows when there is a match in both tables
    Inner,
    /// Left join - every left row, matched or padded with NULLs
    Left,
    /// Right join - every right row, matched or padded with NULLs
    Right,
    /// Full join - every row of both sides
    Full,
}

impl JoinType {
    fn from_keyword(keyword: Option<&str>) -> Self {
        match keyword.map(|k| k.to_uppercase()).as_deref() {
            Some("LEFT") => JoinType::Left,
            Some("RIGHT") => JoinType::Right,
            Some("FULL") => JoinType::Full,
            _ => JoinType::Inner,
        }
    }

    /// Whether unmatched left rows are kept
    pub fn keeps_left(self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    /// Whether unmatched right rows are kept
    pub fn keeps_right(self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        };
        f.write_str(name)
    }
}

/// The single equality condition of a JOIN ... ON clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCondition {
    /// Table named on the left of `=`
    pub left_table: String,
    /// Column named on the left of `=`
    pub left_column: String,
    /// Table named on the right of `=`
    pub right_table: String,
    /// Column named on the right of `=`
    pub right_column: String,
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.left_table, self.left_column, self.right_table, self.right_column
        )
    }
}

/// One parsed JOIN clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    /// INNER, LEFT, RIGHT or FULL
    #[serde(rename = "type")]
    pub join_type: JoinType,
    /// Right-hand table, lower case
    pub table: String,
    /// The ON equality
    pub condition: JoinCondition,
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByItem {
    /// Column, alias or display name to sort on
    pub column: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl fmt::Display for OrderByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// A parsed SELECT statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryComponents {
    /// SELECT items in order
    pub select: Vec<SelectColumn>,
    /// FROM table, lower case
    pub from: String,
    /// JOIN clauses in order; empty when there are none
    pub joins: Vec<Join>,
    /// Raw WHERE predicate
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// GROUP BY columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    /// Raw HAVING predicate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub having: Option<String>,
    /// ORDER BY keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderByItem>>,
    /// Row limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryComponents {
    /// Whether any SELECT item is an aggregate call
    pub fn has_aggregates(&self) -> bool {
        self.select.iter().any(SelectColumn::is_aggregate)
    }
}

/// Collapse whitespace runs, trim, and drop a trailing semicolon
pub fn normalize(sql: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(sql, " ");
    collapsed.trim().trim_end_matches(';').trim_end().to_string()
}

/// Parse a SELECT statement into its components
///
/// # Returns
/// * `Ok(QueryComponents)` for any text with a SELECT list and a FROM table
/// * `Err(StepError::Parse)` otherwise
pub fn parse_query(sql: &str) -> StepResult<QueryComponents> {
    let normalized = normalize(sql);

    let select_caps = SELECT_RE.captures(&normalized);
    let from_caps = FROM_RE.captures(&normalized);
    let (select_caps, from_caps) = match (select_caps, from_caps) {
        (Some(s), Some(f)) => (s, f),
        _ => {
            return Err(StepError::Parse(
                "Must contain SELECT and FROM clauses.".to_string(),
            ))
        }
    };

    let select = split_list(&select_caps[1])
        .iter()
        .map(|item| classify_select_item(item))
        .collect();
    let from = from_caps[1].to_lowercase();

    let joins = parse_joins(&normalized);

    let where_clause = clause_body(&normalized, &WHERE_RE, &WHERE_END_RE);
    let group_by = clause_body(&normalized, &GROUP_BY_RE, &GROUP_BY_END_RE)
        .map(|body| split_list(&body))
        .filter(|cols| !cols.is_empty());
    let having = clause_body(&normalized, &HAVING_RE, &HAVING_END_RE);
    let order_by = clause_body(&normalized, &ORDER_BY_RE, &ORDER_BY_END_RE)
        .map(|body| parse_order_by(&body))
        .filter(|items| !items.is_empty());
    let limit = LIMIT_RE
        .captures(&normalized)
        .and_then(|caps| caps[1].parse::<usize>().ok());

    Ok(QueryComponents {
        select,
        from,
        joins,
        where_clause,
        group_by,
        having,
        order_by,
        limit,
    })
}

/// Text of a clause from its keyword up to the next terminating keyword
fn clause_body(normalized: &str, start: &Regex, end: &Regex) -> Option<String> {
    let m = start.find(normalized)?;
    let rest = &normalized[m.end()..];
    let body = match end.find(rest) {
        Some(stop) => &rest[..stop.start()],
        None => rest,
    };
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_order_by(body: &str) -> Vec<OrderByItem> {
    split_list(body)
        .iter()
        .filter_map(|item| {
            let mut parts = item.split_whitespace();
            let column = parts.next()?.to_string();
            let direction = match parts.next() {
                Some(dir) if dir.eq_ignore_ascii_case("DESC") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            Some(OrderByItem { column, direction })
        })
        .collect()
}

/// Find every JOIN clause, dropping those whose ON condition is unusable
fn parse_joins(normalized: &str) -> Vec<Join> {
    let mut joins = Vec::new();

    for caps in JOIN_RE.captures_iter(normalized) {
        let join_type = JoinType::from_keyword(caps.get(1).map(|m| m.as_str()));
        let table = caps[2].to_lowercase();

        let condition = match (caps.get(3), caps.get(4)) {
            (Some(left), Some(right)) => parse_condition(left.as_str(), right.as_str()),
            _ => None,
        };

        match condition {
            Some(condition) => joins.push(Join {
                join_type,
                table,
                condition,
            }),
            None => debug!(
                "Dropping {} JOIN {}: no usable ON equality",
                join_type, table
            ),
        }
    }

    joins
}

fn parse_condition(left: &str, right: &str) -> Option<JoinCondition> {
    let (left_table, left_column) = parse_operand(left)?;
    let (right_table, right_column) = parse_operand(right)?;
    Some(JoinCondition {
        left_table,
        left_column,
        right_table,
        right_column,
    })
}

/// `table.column` or a bare `column`, which doubles as its own table name
fn parse_operand(operand: &str) -> Option<(String, String)> {
    let caps = OPERAND_RE.captures(operand)?;
    let column = caps[2].to_string();
    let table = caps
        .get(1)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| column.to_lowercase());
    Some((table, column))
}
