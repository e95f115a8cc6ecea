//! Scrape command: fetch every identifier in the id list.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tokio::sync::mpsc;

use crate::cli::progress::ScrapeProgress;
use crate::config::Settings;
use crate::repository::{read_identifiers, CheckpointWriter};
use crate::services::{RunSummary, ScrapeEvent, ScrapeService};
use crate::utils::format_duration;

#[derive(Args, Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// Identifier list (default: <data_dir>/id_list.txt)
    #[arg(long)]
    pub ids: Option<PathBuf>,
    /// Results CSV (default: <data_dir>/tax_results.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Failed identifier list (default: <data_dir>/failed_ids.txt)
    #[arg(long)]
    pub failed: Option<PathBuf>,
    /// Number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// Concurrent requests per worker
    #[arg(short, long = "batch-size")]
    pub batch_size: Option<usize>,
    /// Flush results every N processed identifiers
    #[arg(long)]
    pub checkpoint: Option<usize>,
    /// Delay before each request in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Attempts per identifier
    #[arg(long)]
    pub retries: Option<u32>,
    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ScrapeArgs {
    /// Settings with command-line overrides applied.
    pub fn apply(&self, settings: &Settings) -> Settings {
        let mut settings = settings.clone();
        if let Some(n) = self.workers {
            settings.num_workers = n;
        }
        if let Some(n) = self.batch_size {
            settings.batch_size = n;
        }
        if let Some(n) = self.checkpoint {
            settings.checkpoint_size = n;
        }
        if let Some(ms) = self.delay_ms {
            settings.delay_ms = ms;
        }
        if let Some(n) = self.retries {
            settings.max_retries = n;
        }
        settings
    }

    fn ids_path(&self, settings: &Settings) -> PathBuf {
        self.ids.clone().unwrap_or_else(|| settings.ids_path())
    }

    fn results_path(&self, settings: &Settings) -> PathBuf {
        self.output.clone().unwrap_or_else(|| settings.results_path())
    }

    fn failed_path(&self, settings: &Settings) -> PathBuf {
        self.failed.clone().unwrap_or_else(|| settings.failed_path())
    }
}

/// Scrape all identifiers. A missing or empty id list is reported and
/// yields an empty summary.
pub async fn cmd_scrape(settings: &Settings, args: &ScrapeArgs) -> anyhow::Result<RunSummary> {
    let settings = args.apply(settings);
    settings.validate()?;

    let ids_path = args.ids_path(&settings);
    let ids = match read_identifiers(&ids_path) {
        Ok(ids) => ids,
        Err(e) if e.is_not_found() => {
            println!(
                "{} ID list not found: {}",
                style("!").yellow(),
                ids_path.display()
            );
            println!(
                "  {} Run 'taxscrape ids --input <export.csv>' to create it",
                style("→").dim()
            );
            return Ok(RunSummary::default());
        }
        Err(e) => return Err(e.into()),
    };

    if ids.is_empty() {
        println!(
            "{} No IDs to scrape in {}",
            style("!").yellow(),
            ids_path.display()
        );
        return Ok(RunSummary::default());
    }

    let total = ids.len();
    println!(
        "{} Scraping {} IDs with up to {} workers (batch size {})",
        style("→").cyan(),
        total,
        settings.num_workers,
        settings.batch_size
    );

    let writer = CheckpointWriter::new(args.results_path(&settings), args.failed_path(&settings));
    let service = ScrapeService::new(
        settings.http_client()?,
        settings.page_fetcher()?,
        writer,
        settings.scrape_config(),
    );

    // Event channel for progress updates
    let (event_tx, mut event_rx) = mpsc::channel::<ScrapeEvent>(100);

    let progress_display = if args.no_progress {
        None
    } else {
        Some(Arc::new(ScrapeProgress::new(total)))
    };

    let progress_clone = progress_display.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match progress_clone {
                Some(ref progress) => {
                    progress.handle(&event);
                    if let ScrapeEvent::CheckpointSaved {
                        rows,
                        total_processed,
                    } = event
                    {
                        progress.println(&format!(
                            "{} Saved checkpoint: {} rows ({} processed)",
                            style("✓").green(),
                            rows,
                            total_processed
                        ));
                    }
                }
                None => {
                    if let ScrapeEvent::BatchCompleted {
                        worker_id,
                        batch_len,
                        total_processed,
                        ..
                    } = event
                    {
                        println!("{}", batch_line(worker_id, batch_len, total_processed));
                    }
                }
            }
        }
    });

    let result = service.run_all(ids, Some(event_tx)).await;

    // Wait for event handler to finish
    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }

    if let Some(ref progress) = progress_display {
        progress.finish();
    }

    let summary = result?;

    println!(
        "{} Scraped {} IDs in {} ({} succeeded)",
        style("✓").green(),
        summary.processed,
        format_duration(summary.elapsed),
        summary.succeeded
    );
    println!(
        "  {} {} rows in {}",
        style("→").dim(),
        summary.rows_written,
        args.results_path(&settings).display()
    );
    if let Some(ref failed_path) = summary.failed_path {
        println!(
            "  {} {} failed IDs saved to {}",
            style("!").yellow(),
            summary.failed,
            failed_path.display()
        );
    }

    Ok(summary)
}

/// Per-batch status line printed when the progress bar is off.
fn batch_line(worker_id: usize, batch_len: usize, total_processed: usize) -> String {
    format!(
        "Worker {}: Processed {} IDs (Total: {})",
        worker_id, batch_len, total_processed
    )
}
