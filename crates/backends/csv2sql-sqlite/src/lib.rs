//! SQLite backend adapter for `csv2sql`.
//!
//! SQLite is file-backed: the configured database name is a file path (a
//! `.db` suffix is appended when missing), `create-database` is a no-op and
//! `drop-database` removes the file. Bound values rely on SQLite's type
//! affinity; decimals are bound as text and stored under NUMERIC affinity.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use csv2sql_core_common::adapter::{AdapterError, DatabaseAdapter, ExistingColumn};
use csv2sql_core_common::config::DatabaseConfig;
use csv2sql_core_common::sql::{Placeholders, QuoteStyle, insert_statement, rows_per_statement};
use csv2sql_core_common::types::{SqlType, SqlValue};

const BACKEND: &str = "SQLite";

/// SQLite's historical bind-parameter ceiling; chunks wider than this are
/// split across statements inside the chunk transaction.
const MAX_BIND_PARAMS: usize = 999;

/// Resolves the configured database name to the backing file path.
///
/// Appends a `.db` suffix when the name has none, mirroring the common
/// `sqlite:///<name>.db` convention. `:memory:` passes through untouched.
#[must_use]
pub fn database_file_path(name: &str) -> PathBuf {
    if name == ":memory:" || name.ends_with(".db") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.db"))
    }
}

/// Adapter over a SQLite database file.
pub struct SqliteAdapter {
    pool: SqlitePool,
    path: PathBuf,
}

/// Opens (creating if missing) the configured SQLite database file and
/// verifies it with a health-check query.
///
/// # Errors
///
/// Returns [`AdapterError::Connection`] when the file cannot be opened.
pub async fn connect(config: &DatabaseConfig) -> Result<SqliteAdapter, AdapterError> {
    let path = database_file_path(&config.database);
    let url = format!("sqlite://{}", path.display());

    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| AdapterError::Connection {
            backend: BACKEND,
            detail: format!("invalid database path '{}': {e}", path.display()),
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| AdapterError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

    let adapter = SqliteAdapter { pool, path };
    adapter.ping().await?;
    debug!("connected to SQLite database {}", adapter.path.display());
    Ok(adapter)
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        // no BigDecimal encoding for SQLite in sqlx; NUMERIC affinity
        // converts the text form on insert
        SqlValue::Decimal(d) => query.bind(d.to_string()),
        SqlValue::Date(d) => query.bind(*d),
        SqlValue::DateTime(dt) => query.bind(*dt),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn quote_ident(&self, ident: &str) -> String {
        csv2sql_core_common::sql::quote_ident(ident, QuoteStyle::DoubleQuote)
    }

    fn column_type_sql(&self, ty: &SqlType) -> String {
        match ty {
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt => {
                "INTEGER".to_string()
            },
            SqlType::Decimal { .. } => "NUMERIC".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::DateTime => "DATETIME".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({len})"),
            SqlType::Text => "TEXT".to_string(),
        }
    }

    async fn ping(&self) -> Result<(), AdapterError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AdapterError::Connection {
                backend: BACKEND,
                detail: e.to_string(),
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), AdapterError> {
        debug!("ddl: {sql}");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, AdapterError> {
        // one file == one database
        Ok(vec![self.path.display().to_string()])
    }

    async fn list_tables(&self) -> Result<Vec<String>, AdapterError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;

        rows.iter()
            .map(|r| {
                r.try_get::<String, _>("name")
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))
            })
            .collect()
    }

    async fn table_exists(&self, table: &str) -> Result<bool, AdapterError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(count > 0)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ExistingColumn>, AdapterError> {
        let sql = format!("PRAGMA table_info({})", self.quote_ident(table));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;

        rows.iter()
            .map(|r| {
                let name: String = r
                    .try_get("name")
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
                let data_type: String = r
                    .try_get("type")
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
                Ok(ExistingColumn {
                    name,
                    data_type: data_type.to_ascii_lowercase(),
                })
            })
            .collect()
    }

    async fn insert_chunk(
        &self,
        table: &str,
        columns: &[String],
        _types: &[SqlType],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, AdapterError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;

        let per_statement = rows_per_statement(columns.len(), MAX_BIND_PARAMS);
        let mut inserted = 0u64;

        for batch in rows.chunks(per_statement) {
            let sql = insert_statement(
                table,
                columns,
                batch.len(),
                Placeholders::Question,
                QuoteStyle::DoubleQuote,
            );
            let mut query = sqlx::query(&sql);
            for row in batch {
                for value in row {
                    query = bind_value(query, value);
                }
            }
            let result = query
                .execute(&mut *tx)
                .await
                .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(inserted)
    }

    async fn create_database(&self, name: &str) -> Result<(), AdapterError> {
        // the file is created lazily on first connect
        info!("create-database is a no-op for SQLite ('{name}')");
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<(), AdapterError> {
        let path = database_file_path(name);
        if Path::new(&path).exists() {
            std::fs::remove_file(&path).map_err(|e| AdapterError::Execution {
                backend: BACKEND,
                detail: format!("failed to remove '{}': {e}", path.display()),
            })?;
            info!("removed SQLite database file {}", path.display());
        }
        Ok(())
    }
}
