//! Column type inference over a CSV row stream.
//!
//! For each column the inferencer tracks the narrowest SQL type compatible
//! with every sampled value, widening along the lattice
//! BOOLEAN ⊂ TINYINT ⊂ SMALLINT ⊂ INT ⊂ BIGINT ⊂ DECIMAL ⊂ VARCHAR ⊂ TEXT.
//! Date and datetime formats are checked against a fixed pattern list before
//! falling back to text. Null markers bump a null count and set the nullable
//! flag without influencing the type. Boolean only wins when the entire
//! sampled value set is drawn from the known token set; a single foreign
//! token anywhere forces the column out of BOOLEAN for good.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use csv2sql_core_common::config::CsvOptions;
use csv2sql_core_common::types::SqlType;

use crate::error::Result;
use crate::plan::{ColumnProfile, CsvAnalysis};
use crate::source::{RowStream, is_null_marker};

/// Accepted date patterns, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];

/// Accepted datetime patterns, tried in order.
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// How many sample values to retain per column for the analysis display.
const SAMPLES_PER_COLUMN: usize = 3;

/// How many malformed-row details to retain for diagnostics.
const MALFORMED_SAMPLES: usize = 8;

/// Parses a boolean token, case-insensitively.
#[must_use]
pub fn parse_boolean_token(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Tries the accepted date patterns in order.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Tries the accepted datetime patterns in order.
#[must_use]
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Digit structure of a plain numeric literal: sign, integer digits,
/// optional fractional digits. Scientific notation is not numeric here.
fn numeric_shape(value: &str) -> Option<(u32, u32)> {
    let body = value.strip_prefix(['-', '+']).unwrap_or(value);
    if body.is_empty() {
        return None;
    }
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    if int_part.is_empty() && frac_part.is_none_or(str::is_empty) {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(f) = frac_part {
        if !f.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    // significant integer digits, ignoring leading zeros but keeping one
    let int_digits = int_part.trim_start_matches('0').len().max(1) as u32;
    let frac_digits = frac_part.map_or(0, |f| f.len() as u32);
    Some((int_digits, frac_digits))
}

/// Cleans a header name into a SQL-safe column name.
///
/// Non-alphanumeric characters collapse to single underscores, leading and
/// trailing underscores are trimmed, names starting with a digit gain a
/// `col_` prefix, and an empty result falls back to `unnamed_column`.
#[must_use]
pub fn clean_column_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c);
            last_underscore = false;
        } else if !last_underscore {
            cleaned.push('_');
            last_underscore = true;
        }
    }
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return "unnamed_column".to_string();
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("col_{cleaned}")
    } else {
        cleaned.to_string()
    }
}

/// Per-column accumulator for one scan pass.
#[derive(Debug)]
struct ColumnAccumulator {
    original_name: String,
    null_count: u64,
    non_null_count: u64,
    all_boolean: bool,
    all_integer: bool,
    min_int: i64,
    max_int: i64,
    all_numeric: bool,
    max_int_digits: u32,
    max_frac_digits: u32,
    all_date: bool,
    all_datetime: bool,
    max_length: usize,
    samples: Vec<String>,
}

impl ColumnAccumulator {
    fn new(original_name: String) -> Self {
        Self {
            original_name,
            null_count: 0,
            non_null_count: 0,
            all_boolean: true,
            all_integer: true,
            min_int: i64::MAX,
            max_int: i64::MIN,
            all_numeric: true,
            max_int_digits: 0,
            max_frac_digits: 0,
            all_date: true,
            all_datetime: true,
            max_length: 0,
            samples: Vec::new(),
        }
    }

    fn observe(&mut self, cell: &str) {
        let value = cell.trim();
        if is_null_marker(value) {
            self.null_count += 1;
            return;
        }
        self.non_null_count += 1;
        self.max_length = self.max_length.max(value.chars().count());
        if self.samples.len() < SAMPLES_PER_COLUMN {
            self.samples.push(value.to_string());
        }

        if self.all_boolean && parse_boolean_token(value).is_none() {
            self.all_boolean = false;
        }

        if self.all_numeric {
            match numeric_shape(value) {
                Some((int_digits, frac_digits)) => {
                    self.max_int_digits = self.max_int_digits.max(int_digits);
                    self.max_frac_digits = self.max_frac_digits.max(frac_digits);
                    if frac_digits == 0 {
                        // integer-shaped; overflow past i64 widens to decimal
                        match value.parse::<i64>() {
                            Ok(v) => {
                                self.min_int = self.min_int.min(v);
                                self.max_int = self.max_int.max(v);
                            },
                            Err(_) => self.all_integer = false,
                        }
                    } else {
                        self.all_integer = false;
                    }
                },
                None => {
                    self.all_numeric = false;
                    self.all_integer = false;
                },
            }
        }

        if self.all_date && parse_date(value).is_none() {
            self.all_date = false;
        }
        if self.all_datetime && parse_datetime(value).is_none() {
            self.all_datetime = false;
        }
    }

    /// Resolves the accumulated evidence to the narrowest compatible type.
    fn resolve(self, options: &CsvOptions) -> ColumnProfile {
        let sql_type = if self.non_null_count == 0 {
            SqlType::Text
        } else if self.all_boolean {
            SqlType::Boolean
        } else if self.all_integer && self.all_numeric {
            match (self.min_int, self.max_int) {
                (min, max) if min >= -128 && max <= 127 => SqlType::TinyInt,
                (min, max) if min >= -32_768 && max <= 32_767 => SqlType::SmallInt,
                (min, max) if min >= -2_147_483_648 && max <= 2_147_483_647 => SqlType::Int,
                _ => SqlType::BigInt,
            }
        } else if self.all_numeric {
            // floor of DECIMAL(10,2), widened by what was actually observed
            let scale = self.max_frac_digits.max(2).min(30) as u8;
            let precision = (self.max_int_digits + u32::from(scale)).max(10).min(38) as u8;
            SqlType::Decimal { precision, scale }
        } else if self.all_date {
            SqlType::Date
        } else if self.all_datetime {
            SqlType::DateTime
        } else if self.max_length <= options.max_varchar_length as usize {
            SqlType::Varchar(self.max_length.max(1) as u16)
        } else {
            SqlType::Text
        };

        ColumnProfile {
            name: clean_column_name(&self.original_name),
            original_name: self.original_name,
            sql_type,
            nullable: self.null_count > 0,
            null_count: self.null_count,
            non_null_count: self.non_null_count,
            max_length: self.max_length,
            samples: self.samples,
        }
    }
}

/// Scans a CSV row stream and infers one SQL type per column.
///
/// The scan is bounded by `options.sample_rows` when set; otherwise the
/// whole file is scanned. Malformed rows are counted and skipped.
///
/// # Errors
///
/// Only source-level failures abort the scan; malformed rows do not.
pub fn analyze_stream(stream: &mut RowStream, options: &CsvOptions) -> Result<CsvAnalysis> {
    let mut accumulators: Vec<ColumnAccumulator> = stream
        .headers()
        .iter()
        .map(|h| ColumnAccumulator::new(h.clone()))
        .collect();

    let mut total_rows = 0u64;
    let mut malformed_rows = 0u64;
    let mut malformed_samples = Vec::new();

    while let Some(row) = stream.next_row() {
        match row {
            Ok(cells) => {
                for (acc, cell) in accumulators.iter_mut().zip(&cells) {
                    acc.observe(cell);
                }
                total_rows += 1;
                if let Some(limit) = options.sample_rows {
                    if total_rows >= limit as u64 {
                        break;
                    }
                }
            },
            Err(e) => {
                debug!("skipping malformed row: {e}");
                malformed_rows += 1;
                if malformed_samples.len() < MALFORMED_SAMPLES {
                    malformed_samples.push(e);
                }
            },
        }
    }

    let columns = accumulators
        .into_iter()
        .map(|acc| acc.resolve(options))
        .collect();

    Ok(CsvAnalysis {
        path: stream.path().to_path_buf(),
        total_rows,
        malformed_rows,
        malformed_samples,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn analyze(content: &str) -> CsvAnalysis {
        analyze_with(content, &CsvOptions::default())
    }

    fn analyze_with(content: &str, options: &CsvOptions) -> CsvAnalysis {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("data.csv");
        let mut file = File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        let mut stream = RowStream::open(&path).unwrap();
        analyze_stream(&mut stream, options).unwrap()
    }

    #[test]
    fn test_clean_column_name() {
        assert_eq!(clean_column_name("First Name"), "First_Name");
        assert_eq!(clean_column_name("amount ($)"), "amount");
        assert_eq!(clean_column_name("a--b__c"), "a_b_c");
        assert_eq!(clean_column_name("2024 sales"), "col_2024_sales");
        assert_eq!(clean_column_name("***"), "unnamed_column");
    }

    #[test]
    fn test_small_integers_infer_tinyint() {
        let analysis = analyze("n\n1\n-5\n127\n-128\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::TinyInt);
        assert!(!analysis.columns[0].nullable);
    }

    #[test]
    fn test_integer_width_promotion() {
        assert_eq!(analyze("n\n1\n300\n").columns[0].sql_type, SqlType::SmallInt);
        assert_eq!(analyze("n\n1\n70000\n").columns[0].sql_type, SqlType::Int);
        assert_eq!(
            analyze("n\n1\n3000000000\n").columns[0].sql_type,
            SqlType::BigInt
        );
    }

    #[test]
    fn test_integer_overflowing_i64_widens_to_decimal() {
        let analysis = analyze("n\n99999999999999999999\n");
        assert!(matches!(
            analysis.columns[0].sql_type,
            SqlType::Decimal { .. }
        ));
    }

    #[test]
    fn test_decimal_precision_scale_derived() {
        let analysis = analyze("price\n12345.678\n9.1\n");
        assert_eq!(
            analysis.columns[0].sql_type,
            SqlType::Decimal {
                precision: 10,
                scale: 3
            }
        );
    }

    #[test]
    fn test_decimal_floor_is_10_2() {
        let analysis = analyze("price\n1.5\n2.25\n");
        assert_eq!(
            analysis.columns[0].sql_type,
            SqlType::Decimal {
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_boolean_requires_entire_token_set() {
        let analysis = analyze("flag\ntrue\nFALSE\nyes\n0\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::Boolean);

        // a single foreign token anywhere demotes the column
        let analysis = analyze("flag\ntrue\nfalse\nmaybe\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::Varchar(5));
    }

    #[test]
    fn test_date_and_datetime_patterns() {
        let analysis = analyze("d\n2024-01-02\n03/04/2024\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::Date);

        let analysis = analyze("ts\n2024-01-02 10:30:00\n2024-01-03 11:00:00\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::DateTime);

        // a plain date mixed into a datetime column falls back to varchar
        let analysis = analyze("ts\n2024-01-02 10:30:00\n2024-01-03\n");
        assert!(matches!(analysis.columns[0].sql_type, SqlType::Varchar(_)));
    }

    #[test]
    fn test_varchar_length_and_text_promotion() {
        let analysis = analyze("s\nab\nabcd\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::Varchar(4));

        let long = "x".repeat(300);
        let analysis = analyze(&format!("s\n{long}\n"));
        assert_eq!(analysis.columns[0].sql_type, SqlType::Text);
    }

    #[test]
    fn test_nulls_do_not_affect_type() {
        let analysis = analyze("n\n1\n\n3\nNULL\n");
        let col = &analysis.columns[0];
        assert_eq!(col.sql_type, SqlType::TinyInt);
        assert!(col.nullable);
        assert_eq!(col.null_count, 2);
        assert_eq!(col.non_null_count, 2);
    }

    #[test]
    fn test_all_null_column_is_nullable_text() {
        let analysis = analyze("a,b\n1,\n2,\n");
        assert_eq!(analysis.columns[1].sql_type, SqlType::Text);
        assert!(analysis.columns[1].nullable);
    }

    #[test]
    fn test_malformed_rows_counted_not_fatal() {
        let analysis = analyze("a,b\n1,2\nonly_one\n3,4\n");
        assert_eq!(analysis.total_rows, 2);
        assert_eq!(analysis.malformed_rows, 1);
        assert_eq!(analysis.columns[0].sql_type, SqlType::TinyInt);
    }

    #[test]
    fn test_sample_limit_bounds_scan() {
        let options = CsvOptions {
            sample_rows: Some(2),
            ..CsvOptions::default()
        };
        // the out-of-range value on row 3 is never seen
        let analysis = analyze_with("n\n1\n2\n99999\n", &options);
        assert_eq!(analysis.total_rows, 2);
        assert_eq!(analysis.columns[0].sql_type, SqlType::TinyInt);
    }

    #[test]
    fn test_scenario_id_int_flag_demoted_by_yes_alone() {
        // mixed true/false/yes stays boolean (all tokens known) but a
        // non-token value does not
        let analysis = analyze("id,flag\n1,true\n2,false\n3,maybe\n");
        assert_eq!(analysis.columns[0].sql_type, SqlType::TinyInt);
        assert!(matches!(analysis.columns[1].sql_type, SqlType::Varchar(_)));
    }

    #[test]
    fn test_scientific_notation_is_not_numeric() {
        let analysis = analyze("n\n1e5\n2e6\n");
        assert!(matches!(analysis.columns[0].sql_type, SqlType::Varchar(_)));
    }
}
