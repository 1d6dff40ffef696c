//! Table module for sqlstep
//!
//! This module provides the in-memory data model shared by every stage of
//! the simulator:
//!
//! - [`Value`], a scalar cell with loose numeric coercion helpers
//! - [`TableRow`], a positional row carrying its bookkeeping flags
//! - [`Table`], a named, ordered column list plus rows. The same type is
//!   used for caller-supplied tables and for the working set that is
//!   threaded through the pipeline.
//! - Column resolution with qualified names (`table.column`)

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{StepError, StepResult};

/// Represents a value in a table cell
///
/// Integers and floats are both "numbers": they compare equal when their
/// numeric values are equal, and aggregate results are normalized back to
/// integers when they are whole. Values serialize as bare JSON scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Represents a NULL or missing value
    Null,
    /// Boolean value (true/false)
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

/// Largest integer an f64 can represent exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Value {
    /// Build a numeric value, preferring an integer when `n` is whole
    pub fn number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Value::Integer(n as i64)
        } else {
            Value::Float(n)
        }
    }

    /// Whether this value is an integer or a float
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Whether this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, or `None` when it has no numeric reading
    ///
    /// NULL reads as 0, booleans as 0/1, strings are parsed after trimming
    /// (an empty string reads as 0). NaN has no numeric reading.
    pub fn loose_number(&self) -> Option<f64> {
        let n = match self {
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
        };
        if n.is_nan() {
            None
        } else {
            Some(n)
        }
    }

    /// Numeric coercion used by SUM, AVG, MIN and MAX
    ///
    /// Anything without a numeric reading counts as 0.
    pub fn as_number(&self) -> f64 {
        self.loose_number().unwrap_or(0.0)
    }
}

/// Strict equality: no coercion between text, numbers and booleans.
/// Integers and floats compare by numeric value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) => *a as f64 == *b,
            (Value::Float(a), Value::Integer(b)) => *a == *b as f64,
            _ => false,
        }
    }
}

impl Eq for Value {}

// Numbers hash through their f64 reading so Integer(1) and Float(1.0),
// which are equal, land in the same bucket.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0_u8.hash(state),
            Value::Boolean(b) => {
                1_u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2_u8.hash(state);
                (*i as f64 + 0.0).to_bits().hash(state);
            }
            Value::Float(f) => {
                2_u8.hash(state);
                (*f + 0.0).to_bits().hash(state);
            }
            Value::String(s) => {
                3_u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(float) => write!(f, "{}", float),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Conversion from raw delimited-file text with type inference
///
/// Tries, in order: integer, finite float, boolean (`true`/`false`, any case),
/// empty string as NULL, and finally falls back to a string.
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }

        if let Ok(fl) = s.parse::<f64>() {
            if fl.is_finite() {
                return Value::Float(fl);
            }
        }

        match s.to_lowercase().as_str() {
            "true" => return Value::Boolean(true),
            "false" => return Value::Boolean(false),
            "" => return Value::Null,
            _ => {}
        }

        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One row of a table or working set
///
/// `values` lines up with the column list of the set that owns the row.
/// The bookkeeping attributes are never listed as columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Identifier that is unique within the row's current set
    pub id: String,

    /// One value per column
    pub values: Vec<Value>,

    /// Rejected by a WHERE or HAVING predicate
    #[serde(skip_serializing_if = "is_false")]
    pub excluded: bool,

    /// Synthesized by an outer join for a row without a partner
    #[serde(skip_serializing_if = "is_false")]
    pub unmatched: bool,
}

impl TableRow {
    /// Create a plain row
    pub fn new(id: impl Into<String>, values: Vec<Value>) -> Self {
        TableRow {
            id: id.into(),
            values,
            excluded: false,
            unmatched: false,
        }
    }

    /// Value at a column position, NULL when out of range
    pub fn get(&self, idx: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(idx).unwrap_or(&NULL)
    }
}

/// Resolve a column name against an ordered column list
///
/// An exact match wins. Otherwise the name is matched as a dotted suffix so
/// `name` finds `users.name` and `users.name` finds `users.users.name` after
/// chained joins; a suffix that fits more than one column is ambiguous and
/// resolves to nothing.
pub fn resolve_column(columns: &[String], name: &str) -> Option<usize> {
    if let Some(idx) = columns.iter().position(|c| c == name) {
        return Some(idx);
    }

    let suffix = format!(".{}", name);
    let mut candidates = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ends_with(&suffix));
    match (candidates.next(), candidates.next()) {
        (Some((idx, _)), None) => Some(idx),
        _ => None,
    }
}

/// Represents an in-memory table or working set
#[derive(Debug, Clone)]
pub struct Table {
    /// Name of the table
    name: String,

    /// Column names
    columns: Vec<String>,

    /// Map of column names to their indices
    column_map: HashMap<String, usize>,

    /// Rows of data
    rows: Vec<TableRow>,
}

impl Table {
    /// Create a new, empty table with the given name and columns
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self::from_parts(name, columns, Vec::new())
    }

    /// Create a table from columns and already-built rows
    ///
    /// The caller is responsible for row width; the pipeline builds rows
    /// from the column list it passes here.
    pub fn from_parts(name: &str, columns: Vec<String>, rows: Vec<TableRow>) -> Self {
        // First occurrence wins for duplicate names
        let mut column_map = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            column_map.entry(col.clone()).or_insert(i);
        }

        Table {
            name: name.to_string(),
            columns,
            column_map,
            rows,
        }
    }

    /// Get the name of the table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the columns of the table, in display order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the column count
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the rows of the table
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Consume the table, returning its rows
    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }

    /// Get the row count
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Add a row to the table
    ///
    /// # Returns
    /// * `Ok(())` if the row was successfully added
    /// * `Err` if the row width doesn't match the columns or its id is taken
    pub fn add_row(&mut self, row: TableRow) -> StepResult<()> {
        if row.values.len() != self.columns.len() {
            return Err(StepError::SchemaMismatch(format!(
                "Row has {} values, but table '{}' has {} columns",
                row.values.len(),
                self.name,
                self.columns.len()
            )));
        }
        if self.rows.iter().any(|r| r.id == row.id) {
            return Err(StepError::SchemaMismatch(format!(
                "Duplicate row id '{}' in table '{}'",
                row.id, self.name
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    /// Add a row of values, synthesizing its id
    ///
    /// Ids take the form `<first letter of the table name><1-based position>`,
    /// e.g. `u1`, `u2` for a table called `users`.
    pub fn add_values(&mut self, values: Vec<Value>) -> StepResult<()> {
        let prefix = self
            .name
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('r');
        let id = format!("{}{}", prefix, self.rows.len() + 1);
        self.add_row(TableRow::new(id, values))
    }

    /// Get the index of a column by name
    ///
    /// Falls back to [`resolve_column`] when there is no exact match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_map
            .get(name)
            .copied()
            .or_else(|| resolve_column(&self.columns, name))
    }

    /// Value of a named column in a row of this table
    pub fn value<'a>(&self, row: &'a TableRow, column: &str) -> Option<&'a Value> {
        self.column_index(column).map(|idx| row.get(idx))
    }
}

/// Sort direction for a key in an ORDER BY clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Sort in ascending order (default)
    Asc,
    /// Sort in descending order
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}
