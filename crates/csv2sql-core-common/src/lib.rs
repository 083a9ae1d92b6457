//! Common types and traits shared across `csv2sql` crates.
//!
//! This crate provides the core abstractions that are shared between
//! `csv2sql-core` and the database backend crates, preventing circular
//! dependencies: the SQL type/value vocabulary, the resolved configuration
//! structs, the [`DatabaseAdapter`] capability trait, the static backend
//! registry, and SQL text helpers for building parameterized statements.

pub mod adapter;
pub mod backends;
pub mod config;
pub mod sql;
pub mod types;

// Re-export commonly used types
pub use adapter::{AdapterError, DatabaseAdapter, ExistingColumn};
pub use backends::{Backend, BackendCapabilities, SupportStatus};
pub use config::{AppConfig, CsvOptions, DatabaseConfig, LoggingConfig};
pub use types::{SqlType, SqlValue};
