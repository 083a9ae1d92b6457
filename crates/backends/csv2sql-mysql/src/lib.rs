//! MySQL backend adapter for `csv2sql`.
//!
//! Catalog operations use `SHOW DATABASES` / `information_schema`; database
//! management runs over a short-lived server-level connection with no
//! database selected, so `create-database` works before the target database
//! exists. Identifiers are backtick-quoted.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{ConnectOptions, Row};
use tracing::{debug, info};

use csv2sql_core_common::adapter::{AdapterError, DatabaseAdapter, ExistingColumn};
use csv2sql_core_common::config::DatabaseConfig;
use csv2sql_core_common::sql::{Placeholders, QuoteStyle, insert_statement, rows_per_statement};
use csv2sql_core_common::types::{SqlType, SqlValue};

const BACKEND: &str = "MySQL";

/// MySQL allows 65535 bind placeholders per prepared statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// Adapter over a MySQL (or MariaDB) server.
pub struct MySqlAdapter {
    pool: MySqlPool,
    options: MySqlConnectOptions,
    database: String,
}

fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
}

/// Connects to the configured MySQL database and verifies the connection
/// with a health-check query.
///
/// # Errors
///
/// Returns [`AdapterError::Connection`] when the server is unreachable or
/// refuses the credentials.
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlAdapter, AdapterError> {
    let options = connect_options(config);

    let pool = MySqlPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options.clone().database(&config.database))
        .await
        .map_err(|e| AdapterError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

    let adapter = MySqlAdapter {
        pool,
        options,
        database: config.database.clone(),
    };
    adapter.ping().await?;
    debug!("connected to MySQL database '{}'", adapter.database);
    Ok(adapter)
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Decimal(d) => query.bind(d.clone()),
        SqlValue::Date(d) => query.bind(*d),
        SqlValue::DateTime(dt) => query.bind(*dt),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

impl MySqlAdapter {
    /// Runs one statement over a server-level connection with no database
    /// selected. Used for CREATE/DROP DATABASE.
    async fn execute_server_level(&self, sql: &str) -> Result<(), AdapterError> {
        let mut conn = self
            .options
            .clone()
            .connect()
            .await
            .map_err(|e| AdapterError::Connection {
                backend: BACKEND,
                detail: e.to_string(),
            })?;
        sqlx::query(sql)
            .execute(&mut conn)
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn quote_ident(&self, ident: &str) -> String {
        csv2sql_core_common::sql::quote_ident(ident, QuoteStyle::Backtick)
    }

    fn column_type_sql(&self, ty: &SqlType) -> String {
        // the generic ANSI spelling is MySQL-native for every inferred type
        ty.to_string()
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
        let rows = sqlx::query("SHOW DATABASES")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        rows.iter()
            .map(|r| {
                r.try_get::<String, _>(0)
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))
            })
            .collect()
    }

    async fn list_tables(&self) -> Result<Vec<String>, AdapterError> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? ORDER BY table_name",
        )
        .bind(&self.database)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        rows.iter()
            .map(|r| {
                r.try_get::<String, _>(0)
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))
            })
            .collect()
    }

    async fn table_exists(&self, table: &str) -> Result<bool, AdapterError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
        )
        .bind(&self.database)
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(count > 0)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ExistingColumn>, AdapterError> {
        let rows = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;

        rows.iter()
            .map(|r| {
                let name: String = r
                    .try_get(0)
                    .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
                let data_type: String = r
                    .try_get(1)
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
                QuoteStyle::Backtick,
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
        let sql = format!("CREATE DATABASE IF NOT EXISTS {}", self.quote_ident(name));
        self.execute_server_level(&sql).await?;
        info!("created MySQL database '{name}'");
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<(), AdapterError> {
        let sql = format!("DROP DATABASE IF EXISTS {}", self.quote_ident(name));
        self.execute_server_level(&sql).await?;
        info!("dropped MySQL database '{name}'");
        Ok(())
    }
}
