//! Checkpoint writer for scrape results.
//!
//! Results are appended to a CSV file in flush-sized batches. The first
//! flush of a run recreates the file and writes the header; every later
//! flush, from any worker, appends rows only. Failed identifiers go to a
//! separate file written once at the end of the run.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::info;

use super::ids::write_identifiers;
use crate::error::ScrapeError;
use crate::models::{Identifier, ScrapeOutcome};

/// Header row of the results file.
pub const RESULTS_HEADER: [&str; 2] = ["Property ID", "Result"];

#[derive(Debug, Default)]
struct WriterState {
    header_written: bool,
    rows_written: usize,
    flushes: usize,
}

/// Serializes checkpoint writes from concurrent workers.
#[derive(Debug)]
pub struct CheckpointWriter {
    results_path: PathBuf,
    failed_path: PathBuf,
    state: Mutex<WriterState>,
}

impl CheckpointWriter {
    pub fn new(results_path: impl Into<PathBuf>, failed_path: impl Into<PathBuf>) -> Self {
        Self {
            results_path: results_path.into(),
            failed_path: failed_path.into(),
            state: Mutex::new(WriterState::default()),
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    pub fn failed_path(&self) -> &Path {
        &self.failed_path
    }

    /// Append `rows` to the results file. Returns the number of rows written.
    ///
    /// Errors are not retried; a failed write means accounted progress could
    /// be lost, so callers treat it as fatal.
    pub async fn flush(&self, rows: &[(Identifier, ScrapeOutcome)]) -> Result<usize, ScrapeError> {
        let mut state = self.state.lock().await;

        let first = !state.header_written;
        let file = self.open_results(first)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if first {
            writer.write_record(RESULTS_HEADER)?;
        }
        for (id, outcome) in rows {
            let cell = outcome.to_cell()?;
            writer.write_record([id.as_str(), cell.as_str()])?;
        }
        writer
            .flush()
            .map_err(|e| ScrapeError::io(&self.results_path, e))?;

        state.header_written = true;
        state.rows_written += rows.len();
        state.flushes += 1;

        info!(
            "Checkpoint saved: {} results written to {}",
            rows.len(),
            self.results_path.display()
        );
        Ok(rows.len())
    }

    /// Overwrite the failure file with `ids`, one per line.
    pub fn write_failed(&self, ids: &[Identifier]) -> Result<(), ScrapeError> {
        write_identifiers(&self.failed_path, ids)?;
        info!(
            "Saved {} failed identifiers to {}",
            ids.len(),
            self.failed_path.display()
        );
        Ok(())
    }

    /// Data rows written so far in this run.
    pub async fn rows_written(&self) -> usize {
        self.state.lock().await.rows_written
    }

    /// Number of completed flushes in this run.
    pub async fn flushes(&self) -> usize {
        self.state.lock().await.flushes
    }

    fn open_results(&self, truncate: bool) -> Result<File, ScrapeError> {
        if let Some(parent) = self
            .results_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
        }

        let result = if truncate {
            File::create(&self.results_path)
        } else {
            OpenOptions::new().append(true).open(&self.results_path)
        };
        result.map_err(|e| ScrapeError::io(&self.results_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentHistory, ScrapeData};
    use tempfile::tempdir;

    fn success(id: &str) -> (Identifier, ScrapeOutcome) {
        (
            id.to_string(),
            ScrapeOutcome::Success(ScrapeData {
                total_due: "$1,000.00".to_string(),
                payment_history: PaymentHistory::Rows(vec![]),
            }),
        )
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("results.csv"), dir.path().join("failed.txt"));

        writer.flush(&[success("R1"), success("R2")]).await.unwrap();
        writer.flush(&[success("R3")]).await.unwrap();

        let rows = read_rows(writer.results_path());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Property ID", "Result"]);
        assert_eq!(rows[1][0], "R1");
        assert_eq!(rows[3][0], "R3");
        assert_eq!(writer.rows_written().await, 3);
        assert_eq!(writer.flushes().await, 2);
    }

    #[tokio::test]
    async fn test_first_flush_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "Property ID,Result\nOLD,stale\n").unwrap();

        let writer = CheckpointWriter::new(&path, dir.path().join("failed.txt"));
        writer.flush(&[success("R1")]).await.unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "R1");
    }

    #[tokio::test]
    async fn test_result_cell_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("out").join("results.csv"), dir.path().join("failed.txt"));
        let failure = ("R9".to_string(), ScrapeOutcome::failure("exhausted after 3 attempts, status=500"));

        writer.flush(&[success("R1"), failure.clone()]).await.unwrap();

        let rows = read_rows(writer.results_path());
        assert_eq!(ScrapeOutcome::from_cell(&rows[1][1]).unwrap(), success("R1").1);
        assert_eq!(ScrapeOutcome::from_cell(&rows[2][1]).unwrap(), failure.1);
    }

    #[tokio::test]
    async fn test_concurrent_flushes_do_not_interleave() {
        let dir = tempdir().unwrap();
        let writer = std::sync::Arc::new(CheckpointWriter::new(
            dir.path().join("results.csv"),
            dir.path().join("failed.txt"),
        ));

        let mut handles = Vec::new();
        for worker in 0..4 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                let rows: Vec<_> = (0..25).map(|i| success(&format!("W{}-{}", worker, i))).collect();
                writer.flush(&rows).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let rows = read_rows(writer.results_path());
        assert_eq!(rows.len(), 101);
        assert_eq!(rows.iter().filter(|r| r[0] == "Property ID").count(), 1);
        assert_eq!(rows[0][0], "Property ID");
    }

    #[test]
    fn test_write_failed() {
        let dir = tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("results.csv"), dir.path().join("failed.txt"));

        writer.write_failed(&["R2".to_string(), "R5".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(writer.failed_path()).unwrap(), "R2\nR5\n");
    }

    #[tokio::test]
    async fn test_write_error_propagates() {
        let dir = tempdir().unwrap();
        // A directory where the results file should be
        let blocked = dir.path().join("results.csv");
        fs::create_dir(&blocked).unwrap();

        let writer = CheckpointWriter::new(&blocked, dir.path().join("failed.txt"));
        let err = writer.flush(&[success("R1")]).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Io { .. }));
    }
}
