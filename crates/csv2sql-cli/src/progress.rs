//! Terminal progress rendering for import runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use csv2sql_core::loader::ProgressObserver;

/// Spinner-backed progress display driven by committed chunks.
///
/// The total row count is unknown up front (the file is streamed), so the
/// bar runs as a spinner with cumulative counts in the message.
pub struct ImportProgress {
    bar: ProgressBar,
}

impl ImportProgress {
    #[must_use]
    pub fn new(table: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Invalid progress template"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message(format!("Importing into {table}..."));
        Self { bar }
    }

    /// Clears the spinner; call before printing the final report.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for ImportProgress {
    fn chunk_committed(&mut self, rows_processed: u64, rows_inserted: u64, elapsed: Duration) {
        let rate = if elapsed.as_secs_f64() > 0.0 {
            rows_inserted as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        self.bar.set_message(format!(
            "{rows_inserted}/{rows_processed} rows inserted ({rate:.0} rows/s)"
        ));
    }
}
