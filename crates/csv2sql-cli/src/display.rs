//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions for
//! presenting analysis results, backend capabilities, and import reports
//! in a human-readable format.

use tabled::{Table, Tabled};

use csv2sql_core::loader::ImportReport;
use csv2sql_core::plan::CsvAnalysis;
use csv2sql_core_common::backends::Backend;

/// Table row representation for one analyzed CSV column.
#[derive(Tabled)]
pub struct ColumnRow {
    /// Cleaned SQL column name.
    #[tabled(rename = "Column")]
    pub name: String,
    /// Header as it appeared in the file.
    #[tabled(rename = "CSV Header")]
    pub original: String,
    /// Inferred SQL type.
    #[tabled(rename = "Type")]
    pub sql_type: String,
    /// Whether null markers were seen.
    #[tabled(rename = "Nullable")]
    pub nullable: String,
    /// Count of null cells.
    #[tabled(rename = "Nulls")]
    pub nulls: u64,
    /// Example values, comma-separated.
    #[tabled(rename = "Samples")]
    pub samples: String,
}

/// Table row representation for one backend's capabilities.
#[derive(Tabled)]
pub struct BackendRow {
    /// Short identifier (e.g. `mysql`).
    #[tabled(rename = "Backend")]
    pub short_name: String,
    /// Full descriptive name.
    #[tabled(rename = "Name")]
    pub long_name: String,
    /// Support status for bulk inserts.
    #[tabled(rename = "Bulk Insert")]
    pub bulk_insert: String,
    /// Support status for listing databases.
    #[tabled(rename = "List Databases")]
    pub list_databases: String,
    /// Support status for creating and dropping databases.
    #[tabled(rename = "Manage Databases")]
    pub manage_databases: String,
}

/// Prints the per-column analysis of a CSV file.
pub fn print_analysis(analysis: &CsvAnalysis) {
    println!(
        "\nAnalyzed {} ({} rows, {} malformed):\n",
        analysis.path.display(),
        analysis.total_rows,
        analysis.malformed_rows
    );

    let rows: Vec<ColumnRow> = analysis
        .columns
        .iter()
        .map(|col| ColumnRow {
            name: col.name.clone(),
            original: col.original_name.clone(),
            sql_type: col.sql_type.to_string(),
            nullable: if col.nullable { "YES" } else { "NO" }.to_string(),
            nulls: col.null_count,
            samples: col.samples.join(", "),
        })
        .collect();

    println!("{}", Table::new(rows));

    for err in &analysis.malformed_samples {
        println!("  skipped: {err}");
    }
}

/// Prints the backend capability table.
pub fn print_backends(backends: &[&Backend]) {
    println!("\nAvailable Backends ({} total):\n", backends.len());

    let rows: Vec<BackendRow> = backends
        .iter()
        .map(|b| BackendRow {
            short_name: b.short_name.to_string(),
            long_name: b.long_name.to_string(),
            bulk_insert: b.capabilities.bulk_insert.as_str().to_string(),
            list_databases: b.capabilities.list_databases.as_str().to_string(),
            manage_databases: b.capabilities.manage_databases.as_str().to_string(),
        })
        .collect();

    println!("{}", Table::new(rows));
}

/// Prints a one-column list (databases or tables).
pub fn print_names(heading: &str, names: &[String]) {
    println!("\n{heading} ({}):", names.len());
    for name in names {
        println!("  {name}");
    }
}

/// Prints the summary of a finished import run.
pub fn print_report(table: &str, report: &ImportReport) {
    println!("\nImport into '{table}' finished in {:.2?}:", report.elapsed);
    println!("  rows processed:  {}", report.rows_processed);
    println!("  rows inserted:   {}", report.rows_inserted);
    println!("  rows rejected:   {}", report.rows_rejected);
    println!("  malformed rows:  {}", report.malformed_rows);
    println!("  chunks committed: {}", report.chunks_committed);
    println!("  chunks failed:    {}", report.chunks_failed);

    for err in &report.chunk_errors {
        println!("  failed chunk {}: {} rows rolled back ({})", err.index, err.rows, err.detail);
    }
    for err in &report.rejected_samples {
        println!("  rejected: {err}");
    }
    if report.cancelled {
        println!("  run cancelled before completion");
    }
}
