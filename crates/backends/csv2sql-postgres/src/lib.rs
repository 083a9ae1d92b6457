//! PostgreSQL backend adapter for `csv2sql`.
//!
//! Uses numbered (`$n`) placeholders and double-quoted identifiers. Catalog
//! queries go through `pg_database` / `information_schema`; CREATE/DROP
//! DATABASE run over a short-lived connection to the `postgres` maintenance
//! database because they cannot execute inside a transaction on the target.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Row};
use tracing::{debug, info};

use csv2sql_core_common::adapter::{AdapterError, DatabaseAdapter, ExistingColumn};
use csv2sql_core_common::config::DatabaseConfig;
use csv2sql_core_common::sql::{Placeholders, QuoteStyle, insert_statement, rows_per_statement};
use csv2sql_core_common::types::{SqlType, SqlValue};

const BACKEND: &str = "PostgreSQL";

/// PostgreSQL caps prepared statements at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

/// Adapter over a PostgreSQL server.
pub struct PostgresAdapter {
    pool: PgPool,
    options: PgConnectOptions,
}

fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
}

/// Connects to the configured PostgreSQL database and verifies the
/// connection with a health-check query.
///
/// # Errors
///
/// Returns [`AdapterError::Connection`] when the server is unreachable or
/// refuses the credentials.
pub async fn connect(config: &DatabaseConfig) -> Result<PostgresAdapter, AdapterError> {
    let options = connect_options(config);

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options.clone().database(&config.database))
        .await
        .map_err(|e| AdapterError::Connection {
            backend: BACKEND,
            detail: e.to_string(),
        })?;

    let adapter = PostgresAdapter { pool, options };
    adapter.ping().await?;
    debug!("connected to PostgreSQL database '{}'", config.database);
    Ok(adapter)
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q SqlValue,
    ty: &SqlType,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        // PostgreSQL types bind parameters; a NULL sent as text would not
        // coerce into a non-text column, so NULLs bind with the column type
        SqlValue::Null => match ty {
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt => {
                query.bind(None::<i64>)
            },
            SqlType::Decimal { .. } => query.bind(None::<bigdecimal::BigDecimal>),
            SqlType::Boolean => query.bind(None::<bool>),
            SqlType::Date => query.bind(None::<chrono::NaiveDate>),
            SqlType::DateTime => query.bind(None::<chrono::NaiveDateTime>),
            SqlType::Varchar(_) | SqlType::Text => query.bind(None::<String>),
        },
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Decimal(d) => query.bind(d.clone()),
        SqlValue::Date(d) => query.bind(*d),
        SqlValue::DateTime(dt) => query.bind(*dt),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

impl PostgresAdapter {
    /// Runs one statement against the `postgres` maintenance database.
    /// Used for CREATE/DROP DATABASE.
    async fn execute_maintenance(&self, sql: &str) -> Result<(), AdapterError> {
        let mut conn = self
            .options
            .clone()
            .database("postgres")
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
impl DatabaseAdapter for PostgresAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn quote_ident(&self, ident: &str) -> String {
        csv2sql_core_common::sql::quote_ident(ident, QuoteStyle::DoubleQuote)
    }

    fn column_type_sql(&self, ty: &SqlType) -> String {
        match ty {
            // PostgreSQL has no 1-byte integer; TINYINT widens to SMALLINT
            SqlType::TinyInt | SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Int => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::DateTime => "TIMESTAMP".to_string(),
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
        let rows = sqlx::query(
            "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
        )
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
            "SELECT tablename FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
        )
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
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        Ok(count > 0)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ExistingColumn>, AdapterError> {
        let rows = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 ORDER BY ordinal_position",
        )
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
        types: &[SqlType],
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
                Placeholders::Numbered,
                QuoteStyle::DoubleQuote,
            );
            let mut query = sqlx::query(&sql);
            for row in batch {
                for (value, ty) in row.iter().zip(types) {
                    query = bind_value(query, value, ty);
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
        // CREATE DATABASE has no IF NOT EXISTS; check the catalog first
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pg_database WHERE datname = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AdapterError::from_sqlx(BACKEND, e))?;
        if exists > 0 {
            info!("PostgreSQL database '{name}' already exists");
            return Ok(());
        }

        let sql = format!("CREATE DATABASE {}", self.quote_ident(name));
        self.execute_maintenance(&sql).await?;
        info!("created PostgreSQL database '{name}'");
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<(), AdapterError> {
        let sql = format!("DROP DATABASE IF EXISTS {}", self.quote_ident(name));
        self.execute_maintenance(&sql).await?;
        info!("dropped PostgreSQL database '{name}'");
        Ok(())
    }
}
