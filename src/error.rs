//! Error handling for sqlstep
//!
//! This module defines the error types for the simulator. Structural
//! failures (a query that cannot be parsed, a table that does not exist,
//! a data file that cannot be loaded) abort a run and are reported through
//! [`StepError`]. Row-level predicate failures are a separate, non-fatal
//! category described by [`PredicateError`]; the pipeline absorbs them and
//! treats the row as failing the predicate.
//!
//! The module uses thiserror to minimize boilerplate code.

use thiserror::Error;

/// StepError represents every failure that aborts a query run
///
/// A run that fails produces no snapshots at all. Each variant carries a
/// message that is meant to be shown to the user as-is.
#[derive(Error, Debug)]
pub enum StepError {
    /// The query text is missing a SELECT list or a FROM table
    #[error("Invalid SQL: {0}")]
    Parse(String),

    /// The FROM table or a JOIN table is not in the supplied tables
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// A table with the same name was registered twice
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// A row does not line up with its table's columns
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid `[table_name=]file_path` specification
    #[error("Invalid file specification: {0}")]
    InvalidFileSpec(String),

    /// Error during file system operations (reading table files)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error while parsing delimited table data
    #[error("File parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error while serializing snapshots
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for operations that can produce a StepError
pub type StepResult<T> = std::result::Result<T, StepError>;

/// Failure while evaluating a WHERE or HAVING predicate against one row
///
/// These never escape a query run. The predicate evaluator logs them and
/// reports the row as not matching.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    /// A character sequence the tokenizer does not understand
    #[error("unexpected character '{0}' in predicate")]
    UnexpectedChar(char),

    /// A quoted string that never closes
    #[error("unterminated string literal in predicate")]
    UnterminatedString,

    /// An identifier that is not an attribute of the row
    #[error("unknown identifier '{0}' in predicate")]
    UnknownIdentifier(String),

    /// A token that is valid on its own but not in this position
    #[error("unexpected token '{0}' in predicate")]
    UnexpectedToken(String),

    /// The predicate ended where an operand was required
    #[error("unexpected end of predicate")]
    UnexpectedEnd,

    /// The predicate text was empty
    #[error("empty predicate")]
    Empty,
}
