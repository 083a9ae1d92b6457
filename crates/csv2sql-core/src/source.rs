//! Forward-only lazy CSV row stream.
//!
//! Rows are pulled on demand and never buffered in full, so memory use is
//! bounded by the loader's chunk size rather than the file size. A stream is
//! single-pass; the pipeline reopens the file for its second (load) pass.
//! Rows whose field count differs from the header are surfaced as
//! [`ValidationError`] values and skipped by callers, per the recovery
//! policy for malformed input.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{SourceError, ValidationError};

/// Cell content treated as SQL NULL. Empty cells and a few conventional
/// markers qualify.
#[must_use]
pub fn is_null_marker(cell: &str) -> bool {
    cell.is_empty()
        || cell.eq_ignore_ascii_case("null")
        || cell.eq_ignore_ascii_case("n/a")
        || cell.eq_ignore_ascii_case("na")
}

/// A forward-only stream of decoded CSV rows.
#[derive(Debug)]
pub struct RowStream {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    record: csv::ByteRecord,
    path: PathBuf,
}

impl RowStream {
    /// Opens a CSV file and reads its header record.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Open`] when the file cannot be opened and
    /// [`SourceError::Header`] when the header record cannot be parsed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| SourceError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        // flexible: field-count mismatches are our ValidationErrors, not
        // hard parser errors
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .byte_headers()
            .map_err(|e| SourceError::Header {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect::<Vec<_>>();

        if headers.is_empty() {
            return Err(SourceError::Header {
                path: path.to_path_buf(),
                detail: "empty header record".to_string(),
            });
        }

        Ok(Self {
            reader,
            headers,
            record: csv::ByteRecord::new(),
            path: path.to_path_buf(),
        })
    }

    /// The decoded header names, in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pulls the next row.
    ///
    /// Returns `None` at end of input, `Some(Err(_))` for a malformed row
    /// (wrong field count or a parser error), and `Some(Ok(_))` for a row
    /// decoded into one string per header column.
    pub fn next_row(&mut self) -> Option<std::result::Result<Vec<String>, ValidationError>> {
        let line = self.reader.position().line();
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                if self.record.len() != self.headers.len() {
                    return Some(Err(ValidationError {
                        line,
                        reason: format!(
                            "expected {} fields, found {}",
                            self.headers.len(),
                            self.record.len()
                        ),
                    }));
                }
                let cells = self
                    .record
                    .iter()
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect();
                Some(Ok(cells))
            },
            Err(e) => Some(Err(ValidationError {
                line,
                reason: e.to_string(),
            })),
        }
    }
}
