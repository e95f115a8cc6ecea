//! Concurrent scrape service.
//!
//! Splits the identifier list into one contiguous chunk per worker, runs the
//! workers as tokio tasks, and owns the final flush and failure persistence.
//! Separated from UI concerns - emits events for progress tracking.

mod types;
mod worker;

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tokio::sync::mpsc;
use tracing::{error, info};

pub use types::{RunSummary, ScrapeConfig, ScrapeEvent};
use worker::{BatchRunner, SharedProgress};

use crate::error::ScrapeError;
use crate::models::Identifier;
use crate::repository::CheckpointWriter;
use crate::scrapers::{PageFetcher, Transport};

/// Split `ids` into at most `workers` contiguous chunks of
/// `ceil(len / workers)` identifiers; the last chunk may be shorter.
pub fn partition(ids: &[Identifier], workers: usize) -> Vec<Vec<Identifier>> {
    if ids.is_empty() {
        return Vec::new();
    }
    let chunk_size = ids.len().div_ceil(workers.max(1));
    ids.chunks(chunk_size).map(<[Identifier]>::to_vec).collect()
}

/// Pool coordinator for one scrape run.
///
/// The checkpoint writer tracks whether the header has been written, so a
/// service is consumed by [`ScrapeService::run_all`].
pub struct ScrapeService<T: Transport> {
    transport: Arc<T>,
    fetcher: Arc<PageFetcher>,
    writer: Arc<CheckpointWriter>,
    config: ScrapeConfig,
}

impl<T: Transport> ScrapeService<T> {
    pub fn new(
        transport: T,
        fetcher: PageFetcher,
        writer: CheckpointWriter,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            fetcher: Arc::new(fetcher),
            writer: Arc::new(writer),
            config,
        }
    }

    /// Scrape every identifier and persist the results.
    ///
    /// Fetch failures never abort the run; they end up in the failure file.
    /// A checkpoint or failure-file write error aborts all workers and is
    /// returned.
    pub async fn run_all(
        self,
        ids: Vec<Identifier>,
        event_tx: Option<mpsc::Sender<ScrapeEvent>>,
    ) -> Result<RunSummary, ScrapeError> {
        self.config.validate()?;
        let start = Instant::now();

        let chunks = partition(&ids, self.config.num_workers);
        let progress = Arc::new(SharedProgress::default());

        info!(
            "Using {} workers with batch size of {} for {} IDs",
            chunks.len(),
            self.config.batch_size,
            ids.len()
        );
        if let Some(tx) = &event_tx {
            let _ = tx
                .send(ScrapeEvent::Started {
                    workers: chunks.len(),
                    total: ids.len(),
                })
                .await;
        }

        let mut handles = Vec::with_capacity(chunks.len());
        for (worker_id, chunk) in chunks.into_iter().enumerate() {
            let runner = BatchRunner {
                worker_id,
                transport: self.transport.clone(),
                fetcher: self.fetcher.clone(),
                writer: self.writer.clone(),
                progress: progress.clone(),
                config: self.config,
                event_tx: event_tx.clone(),
            };
            handles.push(tokio::spawn(runner.run(chunk)));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let joined = try_join_all(handles.into_iter().enumerate().map(
            |(worker_id, handle)| async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(ScrapeError::Worker {
                        worker_id,
                        message: e.to_string(),
                    }),
                }
            },
        ))
        .await;

        let buffers = match joined {
            Ok(buffers) => buffers,
            Err(e) => {
                error!("Stopping scrape: {}", e);
                for handle in &abort_handles {
                    handle.abort();
                }
                return Err(e);
            }
        };

        // Leftovers in worker order
        let leftovers: Vec<_> = buffers.into_iter().flatten().collect();
        if !leftovers.is_empty() {
            let rows = self.writer.flush(&leftovers).await?;
            if let Some(tx) = &event_tx {
                let _ = tx
                    .send(ScrapeEvent::CheckpointSaved {
                        rows,
                        total_processed: progress.processed(),
                    })
                    .await;
            }
        }

        let failed_ids = progress.take_failed().await;
        let failed_path = if failed_ids.is_empty() {
            None
        } else {
            self.writer.write_failed(&failed_ids)?;
            Some(self.writer.failed_path().to_path_buf())
        };

        let processed = progress.processed();
        Ok(RunSummary {
            processed,
            succeeded: processed.saturating_sub(failed_ids.len()),
            failed: failed_ids.len(),
            rows_written: self.writer.rows_written().await,
            failed_path,
            elapsed: start.elapsed(),
        })
    }
}
