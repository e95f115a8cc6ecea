//! Terminal progress display for scrape runs.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::ScrapeEvent;

/// Progress bar fed by [`ScrapeEvent`]s.
pub struct ScrapeProgress {
    bar: ProgressBar,
}

impl ScrapeProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let bar_style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(bar_style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn handle(&self, event: &ScrapeEvent) {
        match *event {
            ScrapeEvent::Started { workers, .. } => {
                self.bar.set_message(format!("{} workers", workers));
            }
            ScrapeEvent::BatchCompleted {
                worker_id,
                failed,
                total_processed,
                ..
            } => {
                self.bar.set_position(total_processed as u64);
                if failed > 0 {
                    self.bar.println(format!(
                        "{} Worker {}: {} failed in batch",
                        style("!").yellow(),
                        worker_id,
                        failed
                    ));
                }
            }
            ScrapeEvent::CheckpointSaved {
                rows,
                total_processed,
            } => {
                self.bar.set_message(format!(
                    "checkpoint: {} rows at {}",
                    rows, total_processed
                ));
            }
            ScrapeEvent::WorkerFinished { worker_id } => {
                self.bar.set_message(format!("worker {} finished", worker_id));
            }
        }
    }

    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_drive_bar() {
        let progress = ScrapeProgress::new(6);
        progress.handle(&ScrapeEvent::BatchCompleted {
            worker_id: 1,
            batch_len: 3,
            failed: 0,
            total_processed: 3,
        });
        assert_eq!(progress.bar.position(), 3);

        progress.handle(&ScrapeEvent::WorkerFinished { worker_id: 1 });
        assert_eq!(progress.bar.message(), "worker 1 finished");
        progress.finish();
    }
}
