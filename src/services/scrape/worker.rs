//! Per-worker batch loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use super::types::{ScrapeConfig, ScrapeEvent};
use crate::error::ScrapeError;
use crate::models::{Identifier, ScrapeOutcome};
use crate::repository::CheckpointWriter;
use crate::scrapers::{PageFetcher, Transport};

/// Aggregates shared by every worker of one run.
#[derive(Debug, Default)]
pub(super) struct SharedProgress {
    processed: AtomicUsize,
    failed: Mutex<Vec<Identifier>>,
}

impl SharedProgress {
    /// Count a finished batch. Returns the new total and whether it landed
    /// on a checkpoint.
    pub(super) fn record_batch(&self, batch_len: usize, checkpoint_size: usize) -> (usize, bool) {
        let total = self.processed.fetch_add(batch_len, Ordering::SeqCst) + batch_len;
        (total, is_checkpoint(total, checkpoint_size))
    }

    pub(super) async fn record_failures(&self, ids: Vec<Identifier>) {
        if !ids.is_empty() {
            self.failed.lock().await.extend(ids);
        }
    }

    pub(super) fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub(super) async fn take_failed(&self) -> Vec<Identifier> {
        std::mem::take(&mut *self.failed.lock().await)
    }
}

/// True if `total` is a non-zero exact multiple of `checkpoint_size`.
///
/// A total that jumps over a multiple does not count.
pub(super) fn is_checkpoint(total: usize, checkpoint_size: usize) -> bool {
    checkpoint_size > 0 && total > 0 && total % checkpoint_size == 0
}

/// Drives one worker's chunk through sequential batches.
pub(super) struct BatchRunner<T: Transport> {
    pub(super) worker_id: usize,
    pub(super) transport: Arc<T>,
    pub(super) fetcher: Arc<PageFetcher>,
    pub(super) writer: Arc<CheckpointWriter>,
    pub(super) progress: Arc<SharedProgress>,
    pub(super) config: ScrapeConfig,
    pub(super) event_tx: Option<mpsc::Sender<ScrapeEvent>>,
}

impl<T: Transport> BatchRunner<T> {
    /// Process `chunk` and return the rows not yet flushed.
    pub(super) async fn run(
        self,
        chunk: Vec<Identifier>,
    ) -> Result<Vec<(Identifier, ScrapeOutcome)>, ScrapeError> {
        let mut buffer = Vec::new();

        for batch in chunk.chunks(self.config.batch_size) {
            let session = self.transport.open_session()?;

            // join_all yields results in submission order
            let results = join_all(batch.iter().map(|id| self.fetcher.fetch(&session, id))).await;
            drop(session);

            let failed: Vec<Identifier> = results
                .iter()
                .filter(|(_, outcome)| outcome.is_failure())
                .map(|(id, _)| id.clone())
                .collect();
            let failed_count = failed.len();
            self.progress.record_failures(failed).await;
            buffer.extend(results);

            let (total, checkpoint) = self
                .progress
                .record_batch(batch.len(), self.config.checkpoint_size);

            info!(
                "Worker {}: Processed {} IDs (Total: {})",
                self.worker_id,
                batch.len(),
                total
            );
            self.emit(ScrapeEvent::BatchCompleted {
                worker_id: self.worker_id,
                batch_len: batch.len(),
                failed: failed_count,
                total_processed: total,
            })
            .await;

            if checkpoint && !buffer.is_empty() {
                let rows = self.writer.flush(&buffer).await?;
                buffer.clear();
                self.emit(ScrapeEvent::CheckpointSaved {
                    rows,
                    total_processed: total,
                })
                .await;
            }
        }

        debug!(
            "Worker {} finished with {} unflushed results",
            self.worker_id,
            buffer.len()
        );
        self.emit(ScrapeEvent::WorkerFinished {
            worker_id: self.worker_id,
        })
        .await;

        Ok(buffer)
    }

    async fn emit(&self, event: ScrapeEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
