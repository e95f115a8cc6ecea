//! Scrape service types and events.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScrapeError;

/// Pool and batching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// Identifiers fetched concurrently by one worker.
    pub batch_size: usize,
    /// Upper bound on concurrent workers.
    pub num_workers: usize,
    /// A worker flushes when the processed count after its batch is an exact multiple of this.
    pub checkpoint_size: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            num_workers: 5,
            checkpoint_size: 100,
        }
    }
}

impl ScrapeConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("num_workers", self.num_workers),
            ("checkpoint_size", self.checkpoint_size),
        ] {
            if value == 0 {
                return Err(ScrapeError::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

/// Events emitted while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    /// Workers launched
    Started { workers: usize, total: usize },
    /// One batch of a worker finished
    BatchCompleted {
        worker_id: usize,
        batch_len: usize,
        failed: usize,
        total_processed: usize,
    },
    /// Rows flushed to the results file
    CheckpointSaved { rows: usize, total_processed: usize },
    /// A worker exhausted its chunk
    WorkerFinished { worker_id: usize },
}

/// Result of a full run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Identifiers completed, successful or not.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Data rows written to the results file (header excluded).
    pub rows_written: usize,
    /// Set when failures were persisted.
    pub failed_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// True if nothing was fetched at all.
    pub fn is_empty(&self) -> bool {
        self.processed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_site_limits() {
        let config = ScrapeConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.num_workers, 5);
        assert_eq!(config.checkpoint_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = ScrapeConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));

        let config = ScrapeConfig {
            checkpoint_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
