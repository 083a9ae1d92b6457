//! The database adapter seam between the import pipeline and the backends.
//!
//! Each supported backend (MySQL, PostgreSQL, SQLite) implements
//! [`DatabaseAdapter`] in its own crate, keeping the type-mapping table and
//! catalog SQL colocated with the backend. The pipeline only ever holds a
//! `Box<dyn DatabaseAdapter>`.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SqlType, SqlValue};

/// Errors surfaced by adapter operations.
///
/// Adapters classify every failure as either a connection problem (backend
/// unreachable, pool exhausted, TLS failure) or a statement execution
/// problem. The pipeline treats the former as fatal and the latter as
/// recoverable at chunk granularity.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The backend could not be reached or the connection was lost.
    #[error("connection to {backend} failed: {detail}")]
    Connection {
        /// Backend short name (e.g. `MySQL`).
        backend: &'static str,
        /// Backend-specific detail string.
        detail: String,
    },

    /// A statement failed to execute.
    #[error("{backend} statement failed: {detail}")]
    Execution {
        /// Backend short name.
        backend: &'static str,
        /// Backend-specific detail string.
        detail: String,
    },
}

impl AdapterError {
    /// Classifies a `sqlx` error into connection vs execution for the given
    /// backend.
    ///
    /// Transport-level failures (I/O, TLS, pool lifecycle) become
    /// [`AdapterError::Connection`]; everything reported by the database
    /// itself becomes [`AdapterError::Execution`].
    #[must_use]
    pub fn from_sqlx(backend: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => AdapterError::Connection {
                backend,
                detail: err.to_string(),
            },
            _ => AdapterError::Execution {
                backend,
                detail: err.to_string(),
            },
        }
    }

    /// Returns `true` when the error is a connection failure.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, AdapterError::Connection { .. })
    }
}

/// An existing table column as reported by backend introspection.
#[derive(Debug, Clone)]
pub struct ExistingColumn {
    /// Column name.
    pub name: String,
    /// Backend-native type name, lowercased (e.g. `int`, `character varying`).
    pub data_type: String,
}

/// Capability interface over one database backend.
///
/// One implementation exists per supported backend. An adapter owns a
/// connection pool scoped to a single run: acquired by the backend crate's
/// `connect` function, released by [`DatabaseAdapter::close`] on every exit
/// path.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Backend short name, matching the registry entry.
    fn backend_name(&self) -> &'static str;

    /// Quotes an identifier in the backend's dialect.
    fn quote_ident(&self, ident: &str) -> String;

    /// Renders an inferred [`SqlType`] as the backend-native column type.
    fn column_type_sql(&self, ty: &SqlType) -> String;

    /// Verifies the connection is alive.
    async fn ping(&self) -> Result<(), AdapterError>;

    /// Releases the connection pool.
    async fn close(&self);

    /// Executes a single DDL statement.
    async fn execute_ddl(&self, sql: &str) -> Result<(), AdapterError>;

    /// Lists databases visible to the connection.
    async fn list_databases(&self) -> Result<Vec<String>, AdapterError>;

    /// Lists tables in the current database.
    async fn list_tables(&self) -> Result<Vec<String>, AdapterError>;

    /// Returns `true` if the named table exists in the current database.
    async fn table_exists(&self, table: &str) -> Result<bool, AdapterError>;

    /// Introspects the columns of an existing table.
    async fn table_columns(&self, table: &str) -> Result<Vec<ExistingColumn>, AdapterError>;

    /// Inserts one chunk of rows inside a single transaction.
    ///
    /// Either every row in `rows` is committed or none are. The row count
    /// inserted is returned. Implementations may split the chunk across
    /// several statements to respect bind-parameter limits, but all
    /// statements share the one transaction. `types` gives the planned type
    /// of each column; backends with typed bind parameters need it to send
    /// NULLs with the right parameter type.
    async fn insert_chunk(
        &self,
        table: &str,
        columns: &[String],
        types: &[SqlType],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, AdapterError>;

    /// Creates a database.
    async fn create_database(&self, name: &str) -> Result<(), AdapterError>;

    /// Drops a database.
    async fn drop_database(&self, name: &str) -> Result<(), AdapterError>;
}
