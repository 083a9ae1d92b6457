//! Custom error types for `csv2sql` operations.
//!
//! This module provides structured error handling using `thiserror`. Only
//! errors that abort a run appear in the root [`CsvSqlError`]; row-level
//! [`ValidationError`]s and chunk-level [`ChunkInsertError`]s are recovered
//! locally and aggregated into the final import report instead.

use std::path::PathBuf;
use thiserror::Error;

use csv2sql_core_common::adapter::AdapterError;

/// Main error type for `csv2sql` operations.
///
/// Every variant is fatal to the run it occurs in. It uses
/// `#[error(transparent)]` to delegate display formatting to the underlying
/// error variants.
#[derive(Debug, Error)]
pub enum CsvSqlError {
    /// The database backend could not be reached.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Table lifecycle errors (table exists under `fail`, schema mismatch
    /// under `append`).
    #[error(transparent)]
    Table(#[from] TableLifecycleError),

    /// CSV source errors (file open, unreadable header).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A fatal statement failure outside the chunked load (DDL, catalog
    /// queries).
    #[error("{backend} statement failed: {detail}")]
    Statement {
        /// Backend short name.
        backend: &'static str,
        /// Backend-specific detail string.
        detail: String,
    },

    /// Generic errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The backend was unreachable. Fatal, surfaced immediately, no retry.
#[derive(Debug, Error)]
#[error("cannot connect to {backend}: {detail}")]
pub struct ConnectionError {
    /// Backend short name.
    pub backend: &'static str,
    /// Backend-specific detail string.
    pub detail: String,
}

/// Errors raised while ensuring the target table before a load.
#[derive(Debug, Error)]
pub enum TableLifecycleError {
    /// The table already exists and the if-exists policy is `fail`.
    #[error("table '{table}' already exists (if-exists policy is 'fail')")]
    TableExists {
        /// The offending table name.
        table: String,
    },

    /// The existing table is incompatible with the import plan under the
    /// `append` policy.
    #[error("schema mismatch for table '{table}': {reason}")]
    SchemaMismatch {
        /// The offending table name.
        table: String,
        /// What did not line up.
        reason: String,
    },
}

/// CSV source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The CSV file could not be opened.
    #[error("failed to open CSV file '{}': {source}", path.display())]
    Open {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The header record could not be read.
    #[error("failed to read CSV header from '{}': {detail}", path.display())]
    Header {
        /// The file path.
        path: PathBuf,
        /// Parser detail.
        detail: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured backend kind is not in the registry.
    #[error("unknown database backend '{name}'. Available backends: {available}")]
    UnknownBackend {
        /// The requested backend name.
        name: String,
        /// Comma-separated list of registered backends.
        available: String,
    },

    /// An option value is invalid.
    #[error("invalid {option} option: {message}")]
    InvalidOption {
        /// The option name.
        option: String,
        /// Why it is invalid.
        message: String,
    },
}

/// A malformed row or cell. Recovered: the row is skipped and counted, the
/// run continues.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {reason}")]
pub struct ValidationError {
    /// 1-based line number in the source file (0 when unknown).
    pub line: u64,
    /// What was wrong with the row.
    pub reason: String,
}

/// One chunk's bulk insert failed and was rolled back. Recovered: the run
/// continues with the next chunk and finishes degraded.
#[derive(Debug, Clone, Error)]
#[error("chunk {index} ({rows} rows) rolled back: {detail}")]
pub struct ChunkInsertError {
    /// 0-based chunk index within the run.
    pub index: usize,
    /// Number of rows in the rolled-back chunk.
    pub rows: usize,
    /// Backend detail string.
    pub detail: String,
}

/// Type alias for Results using [`CsvSqlError`].
pub type Result<T> = std::result::Result<T, CsvSqlError>;

impl From<AdapterError> for CsvSqlError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Connection { backend, detail } => {
                CsvSqlError::Connection(ConnectionError { backend, detail })
            },
            AdapterError::Execution { backend, detail } => {
                CsvSqlError::Statement { backend, detail }
            },
        }
    }
}

impl CsvSqlError {
    /// Get a user-friendly error message naming the error kind and the
    /// offending identifier.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection(e) => format!("Connection error: {e}"),
            Self::Table(TableLifecycleError::TableExists { table }) => {
                format!(
                    "Table '{table}' already exists. Use --if-exists replace or append to proceed."
                )
            },
            Self::Table(e @ TableLifecycleError::SchemaMismatch { .. }) => {
                format!("Schema mismatch: {e}")
            },
            Self::Source(e) => format!("CSV error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Statement { backend, detail } => {
                format!("Database error ({backend}): {detail}")
            },
            Self::Other(e) => format!("Error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_classification() {
        let conn = AdapterError::Connection {
            backend: "MySQL",
            detail: "refused".to_string(),
        };
        assert!(matches!(
            CsvSqlError::from(conn),
            CsvSqlError::Connection(_)
        ));

        let exec = AdapterError::Execution {
            backend: "MySQL",
            detail: "syntax".to_string(),
        };
        assert!(matches!(
            CsvSqlError::from(exec),
            CsvSqlError::Statement { .. }
        ));
    }

    #[test]
    fn test_user_messages_name_the_identifier() {
        let err = CsvSqlError::Table(TableLifecycleError::TableExists {
            table: "orders".to_string(),
        });
        assert!(err.user_message().contains("orders"));

        let err = CsvSqlError::Connection(ConnectionError {
            backend: "PostgreSQL",
            detail: "timed out".to_string(),
        });
        assert!(err.user_message().contains("PostgreSQL"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            line: 7,
            reason: "expected 3 fields, found 2".to_string(),
        };
        assert_eq!(err.to_string(), "line 7: expected 3 fields, found 2");
    }
}
