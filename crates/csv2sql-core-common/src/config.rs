//! Resolved application configuration.
//!
//! The CLI merges defaults, an optional YAML/JSON config file, environment
//! variables and command-line flags into one immutable [`AppConfig`] that is
//! passed explicitly into the pipeline entry points. Nothing below the CLI
//! reads configuration ad hoc.

use serde::{Deserialize, Serialize};

/// Database connection settings for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend kind: `mysql`, `postgres` or `sqlite`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Server host (ignored by SQLite).
    pub host: String,
    /// Server port (ignored by SQLite).
    pub port: u16,
    /// Login user (ignored by SQLite).
    pub username: String,
    /// Login password (ignored by SQLite).
    pub password: String,
    /// Database name; for SQLite this is the database file path.
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: "mysql".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "csv2sql".to_string(),
        }
    }
}

/// CSV processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Input encoding. Only UTF-8 is supported; any other value is rejected
    /// at startup.
    pub encoding: String,
    /// Number of rows per bulk-insert chunk.
    pub chunk_size: usize,
    /// Longest observed string that still infers as VARCHAR; anything longer
    /// promotes the column to TEXT.
    pub max_varchar_length: u16,
    /// Maximum number of rows sampled during type inference. `None` scans
    /// the whole file.
    pub sample_rows: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            chunk_size: 10_000,
            max_varchar_length: 255,
            sample_rows: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: Option<String>,
    /// Optional log file path; when set, log output goes to the file instead
    /// of stderr.
    pub file: Option<String>,
}

/// Complete resolved configuration for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// CSV processing settings.
    pub csv: CsvOptions,
    /// Logging settings.
    pub logging: LoggingConfig,
}
