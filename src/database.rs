//! Database module for sqlstep
//!
//! This module provides the table catalog a query runs against. Names are
//! matched case-insensitively, since the parser folds table names to lower
//! case.

use std::collections::BTreeMap;

use crate::error::{StepError, StepResult};
use crate::table::Table;

/// Catalog of named in-memory tables
#[derive(Debug, Clone, Default)]
pub struct Database {
    /// Tables keyed by lower-cased name
    tables: BTreeMap<String, Table>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table under its own name
    ///
    /// # Returns
    /// * `Ok(())` if the table was successfully added
    /// * `Err` if a table with that name already exists
    pub fn add_table(&mut self, table: Table) -> StepResult<()> {
        let key = table.name().to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(StepError::TableAlreadyExists(table.name().to_string()));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    /// Get a reference to a table
    ///
    /// # Returns
    /// * `Ok(&Table)` if the table exists
    /// * `Err(StepError::TableNotFound)` if it doesn't
    pub fn get_table(&self, name: &str) -> StepResult<&Table> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| StepError::TableNotFound(name.to_string()))
    }

    /// Check if a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.tables.values().map(|t| t.name().to_string()).collect()
    }

    /// Get number of tables in the database
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let mut db = Database::new();
        db.add_table(Table::new("Users", vec!["id".to_string()]))
            .unwrap();

        assert!(db.has_table("users"));
        assert_eq!(db.get_table("USERS").unwrap().name(), "Users");
        assert_eq!(db.table_names(), vec!["Users"]);
    }

    #[test]
    fn test_duplicate_and_missing_tables() {
        let mut db = Database::new();
        db.add_table(Table::new("a", Vec::new())).unwrap();
        assert!(matches!(
            db.add_table(Table::new("A", Vec::new())),
            Err(StepError::TableAlreadyExists(_))
        ));
        assert!(matches!(db.get_table("b"), Err(StepError::TableNotFound(_))));
        assert_eq!(db.table_count(), 1);
    }
}
