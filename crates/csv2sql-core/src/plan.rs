//! Import plan data structures.
//!
//! A [`CsvAnalysis`] is the immutable result of the inference scan pass; an
//! [`ImportPlan`] pins the analysis to a target table and an if-exists
//! policy. Once built, a plan's column types never change for the rest of
//! the run, and its column order matches the cell order of every chunk the
//! loader produces.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use csv2sql_core_common::types::SqlType;

use crate::error::ValidationError;

/// One CSV column's inference result.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    /// SQL-safe column name used in DDL and inserts.
    pub name: String,
    /// The header name as it appeared in the file.
    pub original_name: String,
    /// Inferred SQL type.
    pub sql_type: SqlType,
    /// `true` once any null marker was observed in the column.
    pub nullable: bool,
    /// Number of null cells observed.
    pub null_count: u64,
    /// Number of non-null cells observed.
    pub non_null_count: u64,
    /// Longest observed string form.
    pub max_length: usize,
    /// Up to three non-null sample values.
    pub samples: Vec<String>,
}

/// Result of the analysis scan over a CSV file.
#[derive(Debug, Clone)]
pub struct CsvAnalysis {
    /// The analyzed file.
    pub path: PathBuf,
    /// Rows scanned (well-formed rows only).
    pub total_rows: u64,
    /// Count of malformed rows skipped during the scan.
    pub malformed_rows: u64,
    /// First few malformed-row details, for diagnostics.
    pub malformed_samples: Vec<ValidationError>,
    /// Per-column profiles, in file order.
    pub columns: Vec<ColumnProfile>,
}

/// Behavior when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    /// Abort before any data is touched.
    Fail,
    /// Drop and recreate the table from the plan.
    Replace,
    /// Keep the table, validate schema compatibility, append rows.
    Append,
}

impl IfExists {
    /// Returns the policy's canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IfExists::Fail => "fail",
            IfExists::Replace => "replace",
            IfExists::Append => "append",
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(format!(
                "invalid if-exists policy '{other}' (expected fail, replace or append)"
            )),
        }
    }
}

/// Finalized column schema and table policy for one import run.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    /// Target table name.
    pub table: String,
    /// Behavior when the table already exists.
    pub if_exists: IfExists,
    /// Ordered column profiles; cell order in every chunk follows this.
    pub columns: Vec<ColumnProfile>,
}

impl ImportPlan {
    /// Builds a plan from a finished analysis.
    #[must_use]
    pub fn from_analysis(analysis: &CsvAnalysis, table: impl Into<String>, if_exists: IfExists) -> Self {
        Self {
            table: table.into(),
            if_exists,
            columns: analysis.columns.clone(),
        }
    }

    /// The SQL-safe column names, in plan order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
