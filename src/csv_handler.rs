//! CSV file handling module for sqlstep
//!
//! This module loads delimiter-separated files into in-memory tables that
//! queries can then step through. It provides functionality for:
//!
//! - Parsing file specifications in the format `[table_name=]file_path`
//! - Reading a header row as the column list
//! - Inferring a [`Value`] type for every cell
//! - Custom field separators (`-F`), as awk does
//!
//! Row ids are synthesized from the table name (`u1`, `u2`, ... for a table
//! named `users`).

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{StepError, StepResult};
use crate::table::{Table, Value};

/// Loads delimited files as tables
#[derive(Debug, Clone, Default)]
pub struct CsvHandler {
    /// Field separator; a comma when unset
    field_separator: Option<String>,
}

impl CsvHandler {
    /// Create a handler with an optional field separator
    ///
    /// # Arguments
    /// * `field_separator` - A single character, or `\t` for tabs
    pub fn new(field_separator: Option<String>) -> Self {
        CsvHandler { field_separator }
    }

    /// Load a delimited file into an in-memory table
    ///
    /// # Arguments
    /// * `file_spec` - File specification in the format `[table_name=]file_path`.
    ///   Without a table name, the file name without extension is used.
    ///
    /// # Returns
    /// * `Ok(Table)` - The loaded table
    /// * `Err` if the file spec or separator is invalid, the file can't be
    ///   opened, or a record can't be parsed
    pub fn load_csv(&self, file_spec: &str) -> StepResult<Table> {
        let (table_name, file_path) = parse_file_spec(file_spec)?;
        let delimiter = self.delimiter()?;

        let file = File::open(&file_path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()?
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();

        let mut table = Table::new(&table_name, headers);
        for result in reader.records() {
            let record = result?;
            let row = record.iter().map(Value::from).collect();
            table.add_values(row)?;
        }

        debug!(
            "Loaded table '{}' from {}: {} columns, {} rows",
            table_name,
            file_path.display(),
            table.column_count(),
            table.row_count()
        );
        Ok(table)
    }

    /// The separator as a byte
    fn delimiter(&self) -> StepResult<u8> {
        match self.field_separator.as_deref() {
            None => Ok(b','),
            Some("\\t") => Ok(b'\t'),
            Some(sep) if sep.len() == 1 => Ok(sep.as_bytes()[0]),
            Some(sep) => Err(StepError::InvalidFileSpec(format!(
                "Invalid delimiter: {}. Must be a single character.",
                sep
            ))),
        }
    }
}

/// Parse a file specification into table name and file path
///
/// Handles two formats:
/// 1. `table_name=file_path.csv` - Explicit table name and file path
/// 2. `file_path.csv` - Table name derived from file name
fn parse_file_spec(file_spec: &str) -> StepResult<(String, PathBuf)> {
    if let Some((table_name, file_path)) = file_spec.split_once('=') {
        if table_name.is_empty() || file_path.is_empty() {
            return Err(StepError::InvalidFileSpec(format!(
                "Invalid file specification: {}",
                file_spec
            )));
        }
        return Ok((table_name.to_string(), PathBuf::from(file_path)));
    }

    let path = PathBuf::from(file_spec);
    let stem = path.file_stem().ok_or_else(|| {
        StepError::InvalidFileSpec(format!("Invalid file specification: {}", file_spec))
    })?;

    Ok((stem.to_string_lossy().to_string(), path))
}
