//! Sqlstep library crate
//!
//! A stepwise SQL execution simulator. Given a SELECT statement and a set of
//! named in-memory tables, it runs the query through its logical stages
//! (FROM, JOIN, WHERE, GROUP BY, HAVING, SELECT, ORDER BY, LIMIT) and
//! returns an immutable snapshot of the working set after each one.
//!
//! The library provides:
//!
//! - A regex-based clause scanner for a practical SELECT subset
//! - INNER, LEFT, RIGHT and FULL equality joins, shown as four stages each
//! - A closed predicate language for WHERE and HAVING
//! - COUNT, COUNT(DISTINCT), SUM, AVG, MIN and MAX over groups
//! - Row ids that trace each row through every stage
//! - CSV loading and a built-in sample dataset
//!
//! ```
//! use sqlstep::{run, sample::sample_database};
//!
//! let db = sample_database().unwrap();
//! let snapshots = run("SELECT COUNT(*) FROM orders", &db).unwrap();
//! assert_eq!(snapshots.len(), 3);
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod csv_handler;
pub mod database;
pub mod error;
pub mod join;
pub mod parser;
pub mod predicate;
pub mod projection;
pub mod sample;
pub mod select_item;
pub mod snapshot;
pub mod sql_executor;
pub mod table;

pub use sql_executor::{run, SqlExecutor};
