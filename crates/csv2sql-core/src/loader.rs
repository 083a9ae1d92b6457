//! Chunked batch loading of CSV rows into a prepared table.
//!
//! Rows are buffered to the configured chunk size, coerced against the
//! import plan, and handed to the adapter one transactional chunk at a
//! time. A failed chunk rolls back atomically and the run continues;
//! only connection loss aborts the run. Cancellation is observed between
//! chunks, never mid-transaction.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bigdecimal::BigDecimal;
use tracing::{debug, warn};

use csv2sql_core_common::adapter::{AdapterError, DatabaseAdapter};
use csv2sql_core_common::types::{SqlType, SqlValue};

use crate::error::{ChunkInsertError, Result, ValidationError};
use crate::infer::{parse_boolean_token, parse_date, parse_datetime};
use crate::plan::ImportPlan;
use crate::source::{RowStream, is_null_marker};

/// Observer for per-chunk progress, driven after each commit.
pub trait ProgressObserver: Send {
    /// Called after every committed chunk with cumulative counts.
    fn chunk_committed(&mut self, rows_processed: u64, rows_inserted: u64, elapsed: Duration);
}

/// No-op observer for callers that do not render progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn chunk_committed(&mut self, _: u64, _: u64, _: Duration) {}
}

/// Cooperative cancellation flag, checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the loader stops before its next chunk.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one load run.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Well-formed rows read from the source.
    pub rows_processed: u64,
    /// Rows committed to the destination table.
    pub rows_inserted: u64,
    /// Rows dropped because a cell failed coercion.
    pub rows_rejected: u64,
    /// Rows skipped for a field-count mismatch or parse failure.
    pub malformed_rows: u64,
    /// Chunks committed.
    pub chunks_committed: u64,
    /// Chunks rolled back.
    pub chunks_failed: u64,
    /// Details of each failed chunk.
    pub chunk_errors: Vec<ChunkInsertError>,
    /// Samples of rejected rows, capped.
    pub rejected_samples: Vec<ValidationError>,
    /// Whether the run stopped on a cancellation request.
    pub cancelled: bool,
    /// Wall-clock duration of the load.
    pub elapsed: Duration,
}

impl ImportReport {
    /// A degraded run finished but lost rows to rejection or rollback.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.rows_rejected > 0 || self.chunks_failed > 0 || self.malformed_rows > 0
    }
}

const REJECTED_SAMPLES: usize = 8;

/// Coerces one raw cell against its planned type.
///
/// Null markers become [`SqlValue::Null`] regardless of type. The error
/// string names what failed for the rejection log.
pub fn convert_cell(raw: &str, ty: &SqlType) -> std::result::Result<SqlValue, String> {
    let value = raw.trim();
    if is_null_marker(value) {
        return Ok(SqlValue::Null);
    }
    match ty {
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt => {
            let n: i64 = value
                .parse()
                .map_err(|_| format!("'{value}' is not an integer"))?;
            let in_range = match ty {
                SqlType::TinyInt => (-128..=127).contains(&n),
                SqlType::SmallInt => (-32_768..=32_767).contains(&n),
                SqlType::Int => (-2_147_483_648..=2_147_483_647).contains(&n),
                _ => true,
            };
            if !in_range {
                return Err(format!("'{value}' is out of range for {ty}"));
            }
            Ok(SqlValue::Int(n))
        },
        SqlType::Decimal { .. } => BigDecimal::from_str(value)
            .map(SqlValue::Decimal)
            .map_err(|_| format!("'{value}' is not a decimal number")),
        SqlType::Boolean => parse_boolean_token(value)
            .map(SqlValue::Bool)
            .ok_or_else(|| format!("'{value}' is not a boolean")),
        SqlType::Date => parse_date(value)
            .map(SqlValue::Date)
            .ok_or_else(|| format!("'{value}' is not a recognized date")),
        SqlType::DateTime => parse_datetime(value)
            .map(SqlValue::DateTime)
            .ok_or_else(|| format!("'{value}' is not a recognized datetime")),
        SqlType::Varchar(max) => {
            if value.chars().count() > *max as usize {
                Err(format!("value exceeds VARCHAR({max})"))
            } else {
                Ok(SqlValue::Text(value.to_string()))
            }
        },
        SqlType::Text => Ok(SqlValue::Text(value.to_string())),
    }
}

/// Coerces a full row, reporting the first failing column.
fn convert_row(
    cells: &[String],
    plan: &ImportPlan,
) -> std::result::Result<Vec<SqlValue>, String> {
    plan.columns
        .iter()
        .zip(cells)
        .map(|(col, cell)| {
            convert_cell(cell, &col.sql_type)
                .map_err(|reason| format!("column '{}': {reason}", col.name))
        })
        .collect()
}

/// Streams rows from `source` into `plan.table` in transactional chunks.
///
/// Chunk failures are recorded and the run continues with the next chunk;
/// a connection failure aborts immediately.
///
/// # Errors
///
/// Returns an error only on connection loss. Everything else lands in the
/// report.
pub async fn load(
    adapter: &dyn DatabaseAdapter,
    source: &mut RowStream,
    plan: &ImportPlan,
    chunk_size: usize,
    cancel: &CancelFlag,
    observer: &mut dyn ProgressObserver,
) -> Result<ImportReport> {
    let started = Instant::now();
    let columns = plan.column_names();
    let types: Vec<SqlType> = plan.columns.iter().map(|c| c.sql_type.clone()).collect();
    let chunk_size = chunk_size.max(1);
    let mut report = ImportReport::default();
    let mut buffer: Vec<Vec<SqlValue>> = Vec::with_capacity(chunk_size);
    let mut chunk_index = 0usize;
    let mut done = false;

    while !done {
        // fill one chunk
        while buffer.len() < chunk_size {
            match source.next_row() {
                Some(Ok(cells)) => {
                    report.rows_processed += 1;
                    match convert_row(&cells, plan) {
                        Ok(row) => buffer.push(row),
                        Err(reason) => {
                            report.rows_rejected += 1;
                            if report.rejected_samples.len() < REJECTED_SAMPLES {
                                report.rejected_samples.push(ValidationError {
                                    line: report.rows_processed + report.malformed_rows + 1,
                                    reason,
                                });
                            }
                        },
                    }
                },
                Some(Err(e)) => {
                    debug!("skipping malformed row: {e}");
                    report.malformed_rows += 1;
                },
                None => {
                    done = true;
                    break;
                },
            }
        }

        if buffer.is_empty() {
            break;
        }

        let rows = std::mem::take(&mut buffer);
        match adapter.insert_chunk(&plan.table, &columns, &types, &rows).await {
            Ok(inserted) => {
                report.rows_inserted += inserted;
                report.chunks_committed += 1;
                observer.chunk_committed(
                    report.rows_processed,
                    report.rows_inserted,
                    started.elapsed(),
                );
            },
            Err(e @ AdapterError::Connection { .. }) => {
                report.elapsed = started.elapsed();
                return Err(e.into());
            },
            Err(AdapterError::Execution { detail, .. }) => {
                warn!(chunk = chunk_index, rows = rows.len(), "chunk rolled back: {detail}");
                report.chunks_failed += 1;
                report.chunk_errors.push(ChunkInsertError {
                    index: chunk_index,
                    rows: rows.len(),
                    detail,
                });
            },
        }
        chunk_index += 1;

        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
    }

    report.elapsed = started.elapsed();
    Ok(report)
}
