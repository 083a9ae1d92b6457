//! End-to-end pipeline tests against a file-backed SQLite database.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::Row;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use csv2sql_core::error::{CsvSqlError, TableLifecycleError};
use csv2sql_core::loader::{self, CancelFlag, NoProgress, ProgressObserver};
use csv2sql_core::operations;
use csv2sql_core::plan::{IfExists, ImportPlan};
use csv2sql_core::source::RowStream;
use csv2sql_core_common::adapter::{AdapterError, DatabaseAdapter, ExistingColumn};
use csv2sql_core_common::config::{CsvOptions, DatabaseConfig};
use csv2sql_core_common::types::{SqlType, SqlValue};

fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    write!(file, "{content}").unwrap();
    path
}

fn sqlite_config(dir: &Path, name: &str) -> DatabaseConfig {
    DatabaseConfig {
        kind: "sqlite".to_string(),
        database: dir.join(name).to_string_lossy().into_owned(),
        ..DatabaseConfig::default()
    }
}

async fn count_rows(dir: &Path, name: &str, table: &str) -> i64 {
    let db = dir.join(format!("{name}.db"));
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}", db.display()))
        .await
        .unwrap();
    let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(&pool)
        .await
        .unwrap();
    let n: i64 = row.get("n");
    pool.close().await;
    n
}

async fn run_import(
    adapter: &dyn DatabaseAdapter,
    csv: &Path,
    table: &str,
    if_exists: IfExists,
    chunk_size: usize,
) -> csv2sql_core::error::Result<csv2sql_core::ImportReport> {
    let options = CsvOptions {
        chunk_size,
        ..CsvOptions::default()
    };
    let analysis = operations::analyze(csv, &options)?;
    operations::import(
        adapter,
        csv,
        &analysis,
        table,
        if_exists,
        &options,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .await
}

#[tokio::test]
async fn test_import_creates_table_and_loads_in_chunks() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id,flag\n1,true\n2,false\n3,maybe\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    let report = run_import(adapter.as_ref(), &csv, "people", IfExists::Fail, 2)
        .await
        .unwrap();
    adapter.close().await;

    assert_eq!(report.rows_processed, 3);
    assert_eq!(report.rows_inserted, 3);
    assert_eq!(report.chunks_committed, 2);
    assert_eq!(report.chunks_failed, 0);
    assert!(!report.is_degraded());
    assert_eq!(count_rows(dir.path(), "imports", "people").await, 3);
}

#[tokio::test]
async fn test_replace_policy_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", "id\n1\n2\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    for _ in 0..2 {
        run_import(adapter.as_ref(), &csv, "orders", IfExists::Replace, 100)
            .await
            .unwrap();
    }
    adapter.close().await;

    assert_eq!(count_rows(dir.path(), "imports", "orders").await, 2);
}

#[tokio::test]
async fn test_fail_policy_aborts_before_any_rows() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", "id\n1\n2\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    run_import(adapter.as_ref(), &csv, "orders", IfExists::Fail, 100)
        .await
        .unwrap();
    let err = run_import(adapter.as_ref(), &csv, "orders", IfExists::Fail, 100)
        .await
        .unwrap_err();
    adapter.close().await;

    assert!(matches!(
        err,
        CsvSqlError::Table(TableLifecycleError::TableExists { .. })
    ));
    assert_eq!(count_rows(dir.path(), "imports", "orders").await, 2);
}

#[tokio::test]
async fn test_append_adds_rows_to_existing_table() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", "id,amount\n1,10.50\n2,20.00\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    run_import(adapter.as_ref(), &csv, "orders", IfExists::Fail, 100)
        .await
        .unwrap();
    run_import(adapter.as_ref(), &csv, "orders", IfExists::Append, 100)
        .await
        .unwrap();
    adapter.close().await;

    assert_eq!(count_rows(dir.path(), "imports", "orders").await, 4);
}

#[tokio::test]
async fn test_append_rejects_incompatible_schema() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "orders.csv", "id,label\n1,widget\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    adapter
        .execute_ddl("CREATE TABLE orders (id INTEGER, label INTEGER)")
        .await
        .unwrap();
    let err = run_import(adapter.as_ref(), &csv, "orders", IfExists::Append, 100)
        .await
        .unwrap_err();
    adapter.close().await;

    assert!(matches!(
        err,
        CsvSqlError::Table(TableLifecycleError::SchemaMismatch { .. })
    ));
    assert_eq!(count_rows(dir.path(), "imports", "orders").await, 0);
}

#[tokio::test]
async fn test_failed_chunk_rolls_back_without_stopping_the_run() {
    let dir = TempDir::new().unwrap();
    // six rows in chunks of two; rows 3 and 4 violate the unique key
    let csv = write_csv(
        dir.path(),
        "orders.csv",
        "id\n1\n2\n7\n7\n5\n6\n",
    );
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    adapter
        .execute_ddl("CREATE TABLE orders (id INTEGER NOT NULL UNIQUE)")
        .await
        .unwrap();
    let report = run_import(adapter.as_ref(), &csv, "orders", IfExists::Append, 2)
        .await
        .unwrap();
    adapter.close().await;

    assert_eq!(report.chunks_committed, 2);
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.rows_inserted, 4);
    assert!(report.is_degraded());
    assert_eq!(report.chunk_errors.len(), 1);
    assert_eq!(report.chunk_errors[0].rows, 2);
    assert_eq!(count_rows(dir.path(), "imports", "orders").await, 4);
}

#[tokio::test]
async fn test_rejected_rows_are_dropped_individually() {
    let dir = TempDir::new().unwrap();
    // inference is bounded to the first two rows, so the out-of-range value
    // on row three only surfaces at load time and is rejected per-row
    let csv = write_csv(dir.path(), "nums.csv", "n\n1\n2\n99999\n4\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    let options = CsvOptions {
        sample_rows: Some(2),
        ..CsvOptions::default()
    };
    let analysis = operations::analyze(&csv, &options).unwrap();
    let report = operations::import(
        adapter.as_ref(),
        &csv,
        &analysis,
        "nums",
        IfExists::Fail,
        &options,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .await
    .unwrap();
    adapter.close().await;

    assert_eq!(report.rows_processed, 4);
    assert_eq!(report.rows_inserted, 3);
    assert_eq!(report.rows_rejected, 1);
    assert!(report.is_degraded());
    assert_eq!(count_rows(dir.path(), "imports", "nums").await, 3);
}

#[tokio::test]
async fn test_malformed_rows_are_skipped_and_counted() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "rows.csv", "a,b\n1,2\nshort\n3,4\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    let report = run_import(adapter.as_ref(), &csv, "rows", IfExists::Fail, 100)
        .await
        .unwrap();
    adapter.close().await;

    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.malformed_rows, 1);
    assert!(report.is_degraded());
}

#[tokio::test]
async fn test_analyze_only_touches_no_database() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "data.csv", "n,s\n1,alpha\n2,beta\n");
    let analysis = operations::analyze(&csv, &CsvOptions::default()).unwrap();

    assert_eq!(analysis.total_rows, 2);
    assert_eq!(analysis.columns.len(), 2);
    assert!(!dir.path().join("imports.db").exists());
}

/// Observer that requests cancellation as soon as the first chunk commits.
struct CancelAfterFirstChunk(CancelFlag);

impl ProgressObserver for CancelAfterFirstChunk {
    fn chunk_committed(&mut self, _: u64, _: u64, _: Duration) {
        self.0.cancel();
    }
}

#[tokio::test]
async fn test_cancellation_stops_between_chunks() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "events.csv", "id\n1\n2\n3\n4\n5\n6\n");
    let adapter = operations::connect(&sqlite_config(dir.path(), "imports"))
        .await
        .unwrap();

    let options = CsvOptions {
        chunk_size: 2,
        ..CsvOptions::default()
    };
    let cancel = CancelFlag::new();
    let mut observer = CancelAfterFirstChunk(cancel.clone());
    let analysis = operations::analyze(&csv, &options).unwrap();
    let report = operations::import(
        adapter.as_ref(),
        &csv,
        &analysis,
        "events",
        IfExists::Fail,
        &options,
        &cancel,
        &mut observer,
    )
    .await
    .unwrap();
    adapter.close().await;

    // the in-flight chunk committed; nothing past it was read or written
    assert!(report.cancelled);
    assert_eq!(report.chunks_committed, 1);
    assert_eq!(report.rows_processed, 2);
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(count_rows(dir.path(), "imports", "events").await, 2);
}

/// Adapter whose inserts fail as a lost connection, counting attempts.
struct DroppedConnectionAdapter {
    insert_attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl DatabaseAdapter for DroppedConnectionAdapter {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn column_type_sql(&self, ty: &SqlType) -> String {
        ty.to_string()
    }

    async fn ping(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&self) {}

    async fn execute_ddl(&self, _sql: &str) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, AdapterError> {
        Ok(Vec::new())
    }

    async fn list_tables(&self) -> Result<Vec<String>, AdapterError> {
        Ok(Vec::new())
    }

    async fn table_exists(&self, _table: &str) -> Result<bool, AdapterError> {
        Ok(false)
    }

    async fn table_columns(&self, _table: &str) -> Result<Vec<ExistingColumn>, AdapterError> {
        Ok(Vec::new())
    }

    async fn insert_chunk(
        &self,
        _table: &str,
        _columns: &[String],
        _types: &[SqlType],
        _rows: &[Vec<SqlValue>],
    ) -> Result<u64, AdapterError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        Err(AdapterError::Connection {
            backend: "SQLite",
            detail: "connection reset".to_string(),
        })
    }

    async fn create_database(&self, _name: &str) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn drop_database(&self, _name: &str) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_connection_loss_aborts_without_further_chunks() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "wide.csv", "id\n1\n2\n3\n4\n5\n6\n");
    let options = CsvOptions {
        chunk_size: 2,
        ..CsvOptions::default()
    };
    let analysis = operations::analyze(&csv, &options).unwrap();
    let plan = ImportPlan::from_analysis(&analysis, "wide", IfExists::Fail);

    let insert_attempts = Arc::new(AtomicUsize::new(0));
    let adapter = DroppedConnectionAdapter {
        insert_attempts: insert_attempts.clone(),
    };
    let mut stream = RowStream::open(&csv).unwrap();
    let result = loader::load(
        &adapter,
        &mut stream,
        &plan,
        options.chunk_size,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .await;

    // the first failed chunk aborts the run; later chunks are never sent
    assert!(matches!(result, Err(CsvSqlError::Connection(_))));
    assert_eq!(insert_attempts.load(Ordering::SeqCst), 1);
}
