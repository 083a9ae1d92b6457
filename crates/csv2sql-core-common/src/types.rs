//! SQL type and value vocabulary shared by the inferencer, the loader and
//! the backend adapters.
//!
//! [`SqlType`] is the widening lattice used during type inference
//! (BOOLEAN ⊂ TINYINT ⊂ SMALLINT ⊂ INT ⊂ BIGINT ⊂ DECIMAL ⊂ VARCHAR ⊂ TEXT,
//! with DATE/DATETIME recognized against fixed patterns). [`SqlValue`] is a
//! coerced cell value ready to be bound as a statement parameter.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL column type inferred for a CSV column.
///
/// Each backend maps these to its native column type syntax through
/// [`crate::adapter::DatabaseAdapter::column_type_sql`]; the [`fmt::Display`]
/// impl renders the generic ANSI spelling used by MySQL and PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// 1-byte integer, values in [-128, 127].
    TinyInt,
    /// 2-byte integer, values in [-32768, 32767].
    SmallInt,
    /// 4-byte integer.
    Int,
    /// 8-byte integer.
    BigInt,
    /// Fixed-point decimal with total `precision` digits, `scale` of them
    /// after the point.
    Decimal {
        /// Total number of significant digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Boolean column (only inferred when every sampled value is a known
    /// boolean token).
    Boolean,
    /// Calendar date without time of day.
    Date,
    /// Date and time of day, no timezone.
    DateTime,
    /// Bounded string of at most the given length.
    Varchar(u16),
    /// Unbounded string.
    Text,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::TinyInt => write!(f, "TINYINT"),
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Int => write!(f, "INT"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::DateTime => write!(f, "DATETIME"),
            SqlType::Varchar(len) => write!(f, "VARCHAR({len})"),
            SqlType::Text => write!(f, "TEXT"),
        }
    }
}

/// A single coerced cell value, ready to bind as a statement parameter.
///
/// Produced by the batch loader when converting raw CSV strings against an
/// import plan; consumed by the backend adapters' bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL (empty CSV cell).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value (all integer widths bind as 64-bit).
    Int(i64),
    /// Exact decimal value.
    Decimal(BigDecimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// String value.
    Text(String),
}
