//! SELECT item classification
//!
//! Turns one comma-separated SELECT item into a [`SelectColumn`]: an
//! optional `AS alias` is split off, then the expression is matched against
//! the supported aggregate call shapes. Anything that is not an aggregate
//! call is a plain column reference.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*?)\s+AS\s+(\w+)$").expect("valid alias regex"));

static COUNT_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^COUNT\s*\(\s*\*\s*\)$").expect("valid COUNT(*) regex"));

static COUNT_DISTINCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^COUNT\s*\(\s*DISTINCT\s+([\w.]+)\s*\)$").expect("valid COUNT DISTINCT regex")
});

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(COUNT|SUM|AVG|MIN|MAX|DISTINCT)\s*\(\s*([\w.]+)\s*\)$")
        .expect("valid aggregate call regex")
});

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateType {
    /// COUNT: number of rows in the group
    Count,
    /// COUNT(DISTINCT x) or DISTINCT(x): number of distinct values
    DistinctCount,
    /// SUM over numeric-coerced values
    Sum,
    /// AVG over numeric-coerced values
    Avg,
    /// MIN over numeric-coerced values
    Min,
    /// MAX over numeric-coerced values
    Max,
}

impl AggregateType {
    /// Convert a function name to an AggregateType
    ///
    /// `DISTINCT` is accepted as the function form of a distinct count.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "COUNT" => Some(AggregateType::Count),
            "SUM" => Some(AggregateType::Sum),
            "AVG" => Some(AggregateType::Avg),
            "MIN" => Some(AggregateType::Min),
            "MAX" => Some(AggregateType::Max),
            "DISTINCT" => Some(AggregateType::DistinctCount),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateType::Count => "COUNT",
            AggregateType::DistinctCount => "DISTINCT_COUNT",
            AggregateType::Sum => "SUM",
            AggregateType::Avg => "AVG",
            AggregateType::Min => "MIN",
            AggregateType::Max => "MAX",
        };
        f.write_str(name)
    }
}

/// One classified SELECT item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectColumn {
    /// The raw column reference or aggregate call text
    pub expression: String,

    /// Alias given with `AS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Alias if present, else the expression
    pub display_name: String,

    /// Aggregate function and the field it reads, for aggregate items
    #[serde(flatten)]
    pub aggregate: Option<Aggregate>,
}

/// The aggregate part of an aggregate SELECT item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    /// Which aggregate to compute
    pub aggregate_type: AggregateType,
    /// Column the aggregate reads, or `*`
    pub aggregate_field: String,
}

impl SelectColumn {
    /// Whether this item is an aggregate call
    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    /// Whether this item is the `*` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.expression == "*"
    }
}

/// Classify one raw SELECT item
///
/// The item is expected to be already comma-split and may carry
/// surrounding whitespace.
pub fn classify_select_item(raw: &str) -> SelectColumn {
    let item = raw.trim();

    let (expression, alias) = match ALIAS_RE.captures(item) {
        Some(caps) => (caps[1].trim().to_string(), Some(caps[2].to_string())),
        None => (item.to_string(), None),
    };

    let aggregate = classify_aggregate(&expression);
    let display_name = alias.clone().unwrap_or_else(|| expression.clone());

    SelectColumn {
        expression,
        alias,
        display_name,
        aggregate,
    }
}

fn classify_aggregate(expression: &str) -> Option<Aggregate> {
    if COUNT_STAR_RE.is_match(expression) {
        return Some(Aggregate {
            aggregate_type: AggregateType::Count,
            aggregate_field: "*".to_string(),
        });
    }

    if let Some(caps) = COUNT_DISTINCT_RE.captures(expression) {
        return Some(Aggregate {
            aggregate_type: AggregateType::DistinctCount,
            aggregate_field: caps[1].to_string(),
        });
    }

    let caps = CALL_RE.captures(expression)?;
    let aggregate_type = AggregateType::from_name(&caps[1])?;
    Some(Aggregate {
        aggregate_type,
        aggregate_field: caps[2].to_string(),
    })
}
