//! sqlstep - step through the logical execution of a SQL SELECT
//!
//! This tool loads tables (a built-in sample set and/or delimited files),
//! runs each given SELECT through its logical stages, and prints the
//! snapshot recorded after every stage.
//!
//! # Program Flow
//!
//! 1. Parse command-line arguments and set up logging
//! 2. Load the sample tables and the specified files into a catalog
//! 3. Run each SELECT statement, collecting its snapshots
//! 4. Print the snapshots (all of them, or the one picked by `--step`) as
//!    text or JSON

use std::io::{self, BufWriter, Write};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use sqlstep::cli;
use sqlstep::config::{AppConfig, OutputFormat};
use sqlstep::csv_handler::CsvHandler;
use sqlstep::database::Database;
use sqlstep::sample::sample_database;
use sqlstep::snapshot::{write_json, ExecutionSnapshot};
use sqlstep::sql_executor::SqlExecutor;

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    let config = AppConfig::from_args(&args);

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level())),
        )
        .try_init()
        .ok();

    debug!("Arguments: {args:?}");

    let database = load_tables(&config, &args.files)?;
    info!("Loaded tables: {}", database.table_names().join(", "));

    let executor = SqlExecutor::new(&database);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for sql in &args.sql {
        debug!("Executing SQL: {sql}");
        let snapshots = executor
            .execute(sql)
            .with_context(|| format!("Failed to execute SQL: {sql}"))?;

        let selected: &[ExecutionSnapshot] = match config.step() {
            Some(n) => {
                let count = snapshots.len();
                let one = snapshots.get(n).ok_or_else(|| {
                    anyhow!("Step {n} is out of range: the query produced {count} snapshots")
                })?;
                std::slice::from_ref(one)
            }
            None => &snapshots,
        };

        print_snapshots(&mut out, sql, selected, config.format())
            .context("Failed to write output")?;
    }

    out.flush()?;
    Ok(())
}

/// Build the table catalog from the sample set and the given files
fn load_tables(config: &AppConfig, files: &[String]) -> Result<Database> {
    let mut database = if config.use_sample() {
        sample_database().context("Failed to build sample tables")?
    } else {
        Database::new()
    };

    let handler = CsvHandler::new(config.field_separator());
    for file_spec in files {
        let table = handler
            .load_csv(file_spec)
            .with_context(|| format!("Failed to load file: {file_spec}"))?;
        database
            .add_table(table)
            .with_context(|| format!("Failed to register file: {file_spec}"))?;
    }

    Ok(database)
}

fn print_snapshots<W: Write>(
    out: &mut W,
    sql: &str,
    snapshots: &[ExecutionSnapshot],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, snapshots)?,
        OutputFormat::Text => {
            writeln!(out, "-- {sql}")?;
            for snapshot in snapshots {
                snapshot.write_text(out)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
