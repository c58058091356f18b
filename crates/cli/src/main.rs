//! # countytab-cli
//!
//! Command-line interface for normalizing county x date spreadsheet exports.

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::util::pretty::pretty_format_batches;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use countytab_core::{
    CanonicalTable, EntityList, EntityPolicy, NormalizeOptions, NormalizeReport, Normalizer,
    SummaryRow, DATE_FORMAT, MISSING_PLACEHOLDER,
};
use countytab_sheet::{CsvOptions, FileLoadOptions, Sheet};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// countytab - normalize county x date public health spreadsheets
#[derive(Parser)]
#[command(name = "countytab")]
#[command(author, version, about = "Normalize county x date spreadsheet exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format (table, csv, json)
    #[arg(short = 'f', long = "format", default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the normalized table, or write it to a file
    Normalize {
        #[command(flatten)]
        input: InputArgs,

        /// Write to a .csv or .xlsx file instead of printing
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Statewide cumulative, daily and rolling average values per date
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Rolling average window in days
        #[arg(short, long, default_value_t = 7)]
        window: usize,
    },
    /// Entities ranked by their value on a date
    Top {
        #[command(flatten)]
        input: InputArgs,

        /// Number of entities to show
        #[arg(short = 'n', long = "count", default_value_t = 5)]
        count: usize,

        /// Date to rank on (latest date by default)
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
}

/// Source file and normalization settings shared by every command.
#[derive(Args)]
struct InputArgs {
    /// Spreadsheet export (xlsx, xls, ods, csv, tsv)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Reference entity list, one name per line
    #[arg(short, long, value_name = "PATH")]
    entities: PathBuf,

    /// Worksheet to read (first sheet by default)
    #[arg(long)]
    sheet: Option<String>,

    /// Title rows above the header row
    #[arg(long, default_value_t = 1)]
    skip_rows: usize,

    /// Year for headers that only carry month and day
    #[arg(long, default_value_t = 2020)]
    year: i32,

    /// Handling of reference entities missing from the file
    #[arg(long, default_value = "strict")]
    policy: Policy,

    /// Drop dates after this one
    #[arg(long, value_name = "YYYY-MM-DD")]
    through: Option<NaiveDate>,

    /// Value token meaning "not reported" (repeatable; default "--" and "-")
    #[arg(long = "placeholder", value_name = "TOKEN")]
    placeholders: Vec<String>,

    /// Row label to ignore (repeatable; default "Notes")
    #[arg(long = "non-entity", value_name = "LABEL")]
    non_entity_labels: Vec<String>,

    /// Marker introducing a range header
    #[arg(long, default_value = "Through")]
    range_marker: String,
}

/// Output format for results.
#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Pretty table output (default)
    #[default]
    Table,
}

/// Missing reference entity handling.
#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum Policy {
    /// Fail on the first missing entity
    #[default]
    Strict,
    /// Leave missing entities out
    Skip,
    /// Emit an empty row for missing entities
    Fill,
}

impl From<Policy> for EntityPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Strict => EntityPolicy::Strict,
            Policy::Skip => EntityPolicy::Skip,
            Policy::Fill => EntityPolicy::Fill,
        }
    }
}

impl InputArgs {
    fn options(&self) -> NormalizeOptions {
        let mut options = NormalizeOptions::new(self.year)
            .with_entity_policy(self.policy.into())
            .with_range_marker(self.range_marker.as_str());
        if !self.placeholders.is_empty() {
            options = options.with_placeholders(self.placeholders.iter().cloned());
        }
        if !self.non_entity_labels.is_empty() {
            options = options.with_non_entity_labels(self.non_entity_labels.iter().cloned());
        }
        options
    }

    /// Text written for missing values, so written files load back
    fn missing_marker(&self) -> &str {
        self.placeholders
            .first()
            .map_or(MISSING_PLACEHOLDER, String::as_str)
    }

    fn load_options(&self) -> FileLoadOptions {
        FileLoadOptions {
            sheet_name: self.sheet.clone(),
            skip_rows: self.skip_rows,
        }
    }
}

/// One line of `top` output.
#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    rank: u32,
    entity: &'a str,
    value: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match cli.command {
        Command::Normalize { input, output } => {
            let table = load_table(&input)?;
            let marker = input.missing_marker();
            match output {
                Some(path) => write_table(&table, &path, marker),
                None => print_table(&table, cli.format, marker),
            }
        }
        Command::Summary { input, window } => {
            let table = load_table(&input)?;
            print_summary(&table.totals().summary(window), cli.format)
        }
        Command::Top {
            input,
            count,
            date,
        } => {
            let table = load_table(&input)?;
            print_top(&table, date, count, cli.format)
        }
    }
}

/// Read the entity list and the source file, then normalize.
fn load_table(input: &InputArgs) -> Result<CanonicalTable> {
    let entities = EntityList::from_path(&input.entities).with_context(|| {
        format!("Failed to read entity list: {}", input.entities.display())
    })?;

    let sheet = Sheet::from_path(&input.file, &input.load_options())
        .with_context(|| format!("Failed to read file: {}", input.file.display()))?;

    let normalized = Normalizer::new(input.options())
        .normalize(&sheet, &entities)
        .with_context(|| format!("Failed to normalize {}", input.file.display()))?;

    report_notices(&normalized.report);
    tracing::info!(
        file = %input.file.display(),
        entities = normalized.table.shape().0,
        dates = normalized.table.shape().1,
        "loaded table"
    );

    Ok(match input.through {
        Some(cutoff) => normalized.table.through(cutoff),
        None => normalized.table,
    })
}

/// Tell the user about entities that were skipped or filled in.
fn report_notices(report: &NormalizeReport) {
    if !report.skipped_entities.is_empty() {
        eprintln!(
            "{} {} reference entities not in file, skipped: {}",
            "warning:".yellow().bold(),
            report.skipped_entities.len(),
            report.skipped_entities.join(", ")
        );
    }
    if !report.filled_entities.is_empty() {
        eprintln!(
            "{} {} reference entities not in file, left empty: {}",
            "warning:".yellow().bold(),
            report.filled_entities.len(),
            report.filled_entities.join(", ")
        );
    }
}

/// Write the table to a file, picking the format from the extension.
fn write_table(table: &CanonicalTable, path: &Path, missing: &str) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let sheet = table.to_sheet_with_placeholder(missing);
    match extension.as_str() {
        "csv" => sheet.save_as_csv(path),
        "xlsx" => sheet.save_as_xlsx(path),
        other => bail!("Unsupported output format: '{other}'. Expected .csv or .xlsx"),
    }
    .with_context(|| format!("Failed to write file: {}", path.display()))?;

    eprintln!(
        "{} {} x {} table to {}",
        "Wrote".green().bold(),
        table.shape().0,
        table.shape().1,
        path.display()
    );
    Ok(())
}

/// Print the normalized table in the specified format.
fn print_table(table: &CanonicalTable, format: OutputFormat, missing: &str) -> Result<()> {
    if table.is_empty() {
        println!("(empty table)");
        return Ok(());
    }

    match format {
        OutputFormat::Table => {
            let batch = table.to_record_batch()?;
            println!("{}", pretty_format_batches(&[batch])?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(table)?);
        }
        OutputFormat::Csv => {
            let stdout = std::io::stdout();
            table
                .to_sheet_with_placeholder(missing)
                .write_csv(stdout.lock(), CsvOptions::default())?;
        }
    }

    Ok(())
}

/// Print summary rows in the specified format.
fn print_summary(rows: &[SummaryRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", pretty_format_batches(&[summary_batch(rows)?])?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
        OutputFormat::Csv => write_csv_rows(std::io::stdout().lock(), rows)?,
    }
    Ok(())
}

/// Print the top `count` entities on `date` (latest date by default).
fn print_top(
    table: &CanonicalTable,
    date: Option<NaiveDate>,
    count: usize,
    format: OutputFormat,
) -> Result<()> {
    let Some(date) = date.or_else(|| table.latest_date()) else {
        println!("(empty table)");
        return Ok(());
    };
    let ranked = table.ranked_by(date).with_context(|| {
        format!("No column for {} in table", date.format(DATE_FORMAT))
    })?;

    let rows: Vec<RankedRow<'_>> = ranked
        .into_iter()
        .take(count)
        .zip(1u32..)
        .map(|((entity, value), rank)| RankedRow {
            rank,
            entity,
            value,
        })
        .collect();

    match format {
        OutputFormat::Table => {
            println!("{}", date.format(DATE_FORMAT).to_string().cyan().bold());
            println!("{}", pretty_format_batches(&[ranked_batch(&rows)?])?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Csv => write_csv_rows(std::io::stdout().lock(), &rows)?,
    }
    Ok(())
}

/// Serialize rows as CSV with a header line.
fn write_csv_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn summary_batch(rows: &[SummaryRow]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Utf8, false),
        Field::new("cumulative", DataType::Float64, true),
        Field::new("daily", DataType::Float64, true),
        Field::new("rolling_average", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.date.format(DATE_FORMAT).to_string()),
        )),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.cumulative))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.rolling_average))),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn ranked_batch(rows: &[RankedRow<'_>]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("rank", DataType::UInt32, false),
        Field::new("entity", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.rank))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.entity))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.value))),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}
