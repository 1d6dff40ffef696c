//! Configuration module for sqlstep
//!
//! This module provides a centralized configuration structure for the
//! command-line front end. It is built once from the parsed arguments and
//! passed to the components that need it, rather than living in global state.

use clap::ValueEnum;

use crate::cli::StepArgs;

/// How snapshots are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// A header per snapshot followed by comma-delimited rows
    #[default]
    Text,
    /// The snapshot list as a JSON array
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Whether to show verbose (debug-level) diagnostics
    verbose: bool,

    /// Custom field separator for loaded files
    field_separator: Option<String>,

    /// Output format for snapshots
    format: OutputFormat,

    /// Whether the built-in sample tables are loaded
    use_sample: bool,

    /// Print only the snapshot at this zero-based position
    step: Option<usize>,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(
        verbose: bool,
        field_separator: Option<String>,
        format: OutputFormat,
        use_sample: bool,
        step: Option<usize>,
    ) -> Self {
        Self {
            verbose,
            field_separator,
            format,
            use_sample,
            step,
        }
    }

    /// Build the configuration from command-line arguments
    ///
    /// The sample tables are loaded when asked for, or when no files are given.
    pub fn from_args(args: &StepArgs) -> Self {
        Self::new(
            args.verbose,
            args.field_separator.clone(),
            args.format,
            args.sample || args.files.is_empty(),
            args.step,
        )
    }

    /// Get the verbose flag
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Get the field separator
    pub fn field_separator(&self) -> Option<String> {
        self.field_separator.clone()
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Get whether the sample tables are loaded
    pub fn use_sample(&self) -> bool {
        self.use_sample
    }

    /// Get the single snapshot to print, if any
    pub fn step(&self) -> Option<usize> {
        self.step
    }

    /// Default log filter directive for the configured verbosity
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
