//! `csv2sql-core` is the import pipeline for the `csv2sql` project: CSV
//! analysis, table lifecycle, and chunked batch loading over a database
//! adapter.
//!
//! This crate includes:
//! - **Type Inference**: a one-pass scan that assigns each CSV column the
//!   narrowest compatible SQL type.
//! - **Table Lifecycle**: `fail`/`replace`/`append` policies and table
//!   creation from an import plan.
//! - **Batch Loader**: transactional chunked inserts with per-row
//!   rejection and per-chunk rollback.
//! - **Operations**: the high-level verbs the CLI exposes, routed through
//!   a boxed [`DatabaseAdapter`](csv2sql_core_common::adapter::DatabaseAdapter).

pub mod error;
pub mod infer;
pub mod lifecycle;
pub mod loader;
pub mod operations;
pub mod plan;
pub mod source;

pub use error::{CsvSqlError, Result};
pub use loader::{CancelFlag, ImportReport, NoProgress, ProgressObserver};
pub use plan::{ColumnProfile, CsvAnalysis, IfExists, ImportPlan};
