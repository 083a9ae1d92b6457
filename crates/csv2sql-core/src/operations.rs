//! High-level operations: the verbs the CLI exposes.
//!
//! Each operation composes the analysis, lifecycle, and loading stages
//! over a boxed [`DatabaseAdapter`]. Connection routing from a backend
//! name to a concrete adapter lives here so the CLI stays free of
//! backend-specific types.

use std::path::Path;

use tracing::info;

use csv2sql_core_common::adapter::DatabaseAdapter;
use csv2sql_core_common::backends::find_backend;
use csv2sql_core_common::config::{CsvOptions, DatabaseConfig};

use crate::error::{ConfigError, Result};
use crate::infer::analyze_stream;
use crate::lifecycle::prepare_table;
use crate::loader::{CancelFlag, ImportReport, ProgressObserver, load};
use crate::plan::{CsvAnalysis, IfExists, ImportPlan};
use crate::source::RowStream;

/// Opens a connection to the configured backend and returns its adapter.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownBackend`] for an unrecognized backend
/// name, or a connection error when the backend is unreachable.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DatabaseAdapter>> {
    let backend = find_backend(&config.kind).ok_or_else(|| ConfigError::UnknownBackend {
        name: config.kind.clone(),
        available: csv2sql_core_common::backends::get_backend_names().join(", "),
    })?;
    let adapter: Box<dyn DatabaseAdapter> = match backend.short_name {
        "mysql" => Box::new(csv2sql_mysql::connect(config).await?),
        "postgres" => Box::new(csv2sql_postgres::connect(config).await?),
        "sqlite" => Box::new(csv2sql_sqlite::connect(config).await?),
        other => {
            return Err(ConfigError::UnknownBackend {
                name: other.to_string(),
                available: csv2sql_core_common::backends::get_backend_names().join(", "),
            }
            .into());
        },
    };
    adapter.ping().await?;
    info!(backend = backend.short_name, "connected");
    Ok(adapter)
}

/// Derives a table name from a CSV file path.
///
/// The file stem is lowercased with spaces and hyphens folded to
/// underscores, matching the column-name cleaning rules.
#[must_use]
pub fn table_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = crate::infer::clean_column_name(&stem).to_lowercase();
    if cleaned == "unnamed_column" {
        "imported_data".to_string()
    } else {
        cleaned
    }
}

/// Analyzes a CSV file without touching any database.
///
/// # Errors
///
/// Fails when the file cannot be opened or its header is unusable.
pub fn analyze(path: &Path, options: &CsvOptions) -> Result<CsvAnalysis> {
    let mut stream = RowStream::open(path)?;
    analyze_stream(&mut stream, options)
}

/// Runs an import from a completed analysis: prepare the table, then
/// load in chunks. Callers run [`analyze`] first so they can show the
/// inferred schema before any DDL happens.
///
/// # Errors
///
/// Fails on source errors, lifecycle policy violations, or connection
/// loss. Recoverable row and chunk failures land in the returned report.
#[allow(clippy::too_many_arguments)]
pub async fn import(
    adapter: &dyn DatabaseAdapter,
    path: &Path,
    analysis: &CsvAnalysis,
    table: &str,
    if_exists: IfExists,
    options: &CsvOptions,
    cancel: &CancelFlag,
    observer: &mut dyn ProgressObserver,
) -> Result<ImportReport> {
    let plan = ImportPlan::from_analysis(analysis, table, if_exists);
    prepare_table(adapter, &plan).await?;

    // second pass over the file for the actual load
    let mut stream = RowStream::open(path)?;
    let report = load(
        adapter,
        &mut stream,
        &plan,
        options.chunk_size,
        cancel,
        observer,
    )
    .await?;
    info!(
        table,
        rows = report.rows_inserted,
        chunks = report.chunks_committed,
        "import finished"
    );
    Ok(report)
}

/// Lists databases visible to the connection.
pub async fn list_databases(adapter: &dyn DatabaseAdapter) -> Result<Vec<String>> {
    Ok(adapter.list_databases().await?)
}

/// Lists tables in the current database.
pub async fn list_tables(adapter: &dyn DatabaseAdapter) -> Result<Vec<String>> {
    Ok(adapter.list_tables().await?)
}

/// Creates a database on the connected server.
pub async fn create_database(adapter: &dyn DatabaseAdapter, name: &str) -> Result<()> {
    adapter.create_database(name).await?;
    info!(database = name, "database created");
    Ok(())
}

/// Drops a database on the connected server.
pub async fn drop_database(adapter: &dyn DatabaseAdapter, name: &str) -> Result<()> {
    adapter.drop_database(name).await?;
    info!(database = name, "database dropped");
    Ok(())
}
