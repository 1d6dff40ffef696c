//! CLI argument parsing module for sqlstep
//!
//! This module defines the command-line interface using the clap crate.
//! Key features of the CLI:
//! - One or more SELECT statements per invocation, each stepped separately
//! - Tables from the built-in sample set and/or delimited files
//! - Text or JSON output, optionally limited to a single stage

use anyhow::Result;
use clap::Parser;

use crate::config::OutputFormat;

/// Command-line arguments for sqlstep
#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Step through the logical execution of a SQL SELECT"
)]
pub struct StepArgs {
    /// SELECT statements to step through
    ///
    /// Each statement is run independently against the same tables.
    /// Example: -s "SELECT name FROM users WHERE age > 25"
    #[clap(short, long, required = true, help = "SQL SELECT statement to execute")]
    pub sql: Vec<String>,

    /// Input files to load - format: [table_name=]file_path
    ///
    /// Without a table name, the base filename (without extension) is used.
    /// When no files are given, the built-in sample tables are loaded.
    #[clap(help = "Input files to load as [table_name=]file_path")]
    pub files: Vec<String>,

    /// Load the sample tables (users, orders, departments, sales)
    #[clap(long, help = "Load the built-in sample tables")]
    pub sample: bool,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Text, help = "Output format")]
    pub format: OutputFormat,

    /// Print only the snapshot at this zero-based position
    #[clap(long, help = "Print only the snapshot at this position (0-based)")]
    pub step: Option<usize>,

    /// Specify field separator character
    ///
    /// Similar to awk's -F option. Examples: -F: for colon-separated files,
    /// -F\\t for tab-separated files.
    #[clap(short = 'F', help = "Field separator character")]
    pub field_separator: Option<String>,

    /// Enable verbose diagnostic output
    #[clap(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Parse command-line arguments into the StepArgs structure
pub fn parse_args() -> Result<StepArgs> {
    Ok(StepArgs::parse())
}
