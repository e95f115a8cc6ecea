//! End-to-end scrape runs against an in-memory site.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::mpsc;

use taxscrape::models::{ScrapeOutcome, PAYMENT_TABLE_NOT_FOUND, TOTAL_DUE_NOT_FOUND};
use taxscrape::repository::{read_identifiers, CheckpointWriter};
use taxscrape::scrapers::{
    FieldExtractor, HttpResponse, PageFetcher, RetryPolicy, Session, Transport, UrlTemplate,
};
use taxscrape::services::{process_results, ScrapeConfig, ScrapeEvent, ScrapeService};
use taxscrape::ScrapeError;

#[derive(Clone)]
enum Page {
    Html(String),
    Status(u16),
}

/// Serves fixed pages keyed by the last path segment of the URL.
#[derive(Clone, Default)]
struct FakeSite {
    pages: Arc<HashMap<String, Page>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    sessions: Arc<AtomicUsize>,
    refuse_sessions: bool,
}

impl FakeSite {
    fn new(pages: Vec<(&str, Page)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|(id, p)| (id.to_string(), p)).collect()),
            ..Default::default()
        }
    }

    fn hits(&self, id: &str) -> usize {
        self.hits.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

struct FakeSession {
    site: FakeSite,
}

#[async_trait]
impl Session for FakeSession {
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError> {
        let id = url.rsplit('/').next().unwrap_or_default().to_string();
        *self.site.hits.lock().unwrap().entry(id.clone()).or_default() += 1;
        match self.site.pages.get(&id) {
            Some(Page::Html(body)) => Ok(HttpResponse::new(200, body.clone())),
            Some(Page::Status(status)) => Ok(HttpResponse::new(*status, "")),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

impl Transport for FakeSite {
    type Session = FakeSession;

    fn open_session(&self) -> Result<FakeSession, ScrapeError> {
        if self.refuse_sessions {
            return Err(ScrapeError::Config("no sessions available".to_string()));
        }
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession { site: self.clone() })
    }
}

fn detail_page(total_due: &str, payments: &[[&str; 5]]) -> Page {
    let rows: String = payments
        .iter()
        .map(|p| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href=\"#\">{}</a></td></tr>",
                p[0], p[1], p[2], p[3], p[4]
            )
        })
        .collect();
    Page::Html(format!(
        "<html><body><table><tr><td id=\"dnn_ctr368_View_tdPMTotalDue\">{}</td></tr></table>\
         <table id=\"tblPaymentHistoryData\"><tr><th>Year</th><th>Transaction</th><th>Effective</th>\
         <th>Amount</th><th>Receipt</th></tr>{}</table></body></html>",
        total_due, rows
    ))
}

fn fetcher(max_retries: u32) -> PageFetcher {
    PageFetcher::new(
        UrlTemplate::new("http://tax.test/detail/{id}").unwrap(),
        FieldExtractor::standard().unwrap(),
        RetryPolicy::new(max_retries, Duration::ZERO),
    )
}

fn writer(dir: &Path) -> CheckpointWriter {
    CheckpointWriter::new(dir.join("tax_results.csv"), dir.join("failed_ids.txt"))
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn result_rows(path: &Path) -> Vec<(String, ScrapeOutcome)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["Property ID", "Result"]);
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), ScrapeOutcome::from_cell(&r[1]).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn small_run_writes_one_final_checkpoint() {
    let dir = tempdir().unwrap();
    let site = FakeSite::new(vec![
        (
            "R001",
            detail_page("$2,300.50", &[["2023", "01-15-2024", "01-15-2024", "$1,200.00", "98765"]]),
        ),
        ("R002", detail_page("$0.00", &[])),
        ("R003", Page::Html("<html><body><p>No record</p></body></html>".to_string())),
    ]);
    let config = ScrapeConfig {
        batch_size: 2,
        num_workers: 2,
        checkpoint_size: 100,
    };

    let service = ScrapeService::new(site.clone(), fetcher(3), writer(dir.path()), config);
    let summary = service.run_all(ids(&["R001", "R002", "R003"]), None).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.rows_written, 3);
    assert!(summary.failed_path.is_none());
    assert!(!dir.path().join("failed_ids.txt").exists());
    assert_eq!(site.sessions.load(Ordering::SeqCst), 2);

    let rows = result_rows(&dir.path().join("tax_results.csv"));
    let order: Vec<_> = rows.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["R001", "R002", "R003"]);

    let first = rows[0].1.data().unwrap();
    assert_eq!(first.total_due, "$2,300.50");
    assert_eq!(first.payment_history.rows()[0].receipt_number, "98765");

    let empty = rows[2].1.data().unwrap();
    assert_eq!(empty.total_due, TOTAL_DUE_NOT_FOUND);
    assert!(empty.payment_history.is_missing());
    assert!(rows[2].1.to_cell().unwrap().contains(PAYMENT_TABLE_NOT_FOUND));
}

#[tokio::test]
async fn persistent_server_errors_go_to_failure_file() {
    let dir = tempdir().unwrap();
    let site = FakeSite::new(vec![
        ("R100", detail_page("$10.00", &[])),
        ("R101", Page::Status(500)),
    ]);

    let service = ScrapeService::new(
        site.clone(),
        fetcher(3),
        writer(dir.path()),
        ScrapeConfig::default(),
    );
    let summary = service.run_all(ids(&["R100", "R101"]), None).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(site.hits("R101"), 3);
    assert_eq!(site.hits("R100"), 1);

    let failed = read_identifiers(&dir.path().join("failed_ids.txt")).unwrap();
    assert_eq!(failed, vec!["R101"]);

    let rows = result_rows(&dir.path().join("tax_results.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1].1,
        ScrapeOutcome::failure("exhausted after 3 attempts, status=500")
    );
}

#[tokio::test]
async fn every_identifier_lands_in_results_exactly_once() {
    let dir = tempdir().unwrap();
    let all: Vec<String> = (0..23).map(|i| format!("R{:03}", i)).collect();
    let pages: Vec<(&str, Page)> = all
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let page = if i % 5 == 0 {
                Page::Status(503)
            } else {
                detail_page("$1.00", &[])
            };
            (id.as_str(), page)
        })
        .collect();
    let site = FakeSite::new(pages);
    let config = ScrapeConfig {
        batch_size: 2,
        num_workers: 4,
        checkpoint_size: 4,
    };

    let service = ScrapeService::new(site, fetcher(2), writer(dir.path()), config);
    let summary = service.run_all(all.clone(), None).await.unwrap();
    assert_eq!(summary.processed, all.len());
    assert_eq!(summary.rows_written, all.len());

    let mut written: Vec<String> = result_rows(&dir.path().join("tax_results.csv"))
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    written.sort();
    assert_eq!(written, all);

    let mut failed = read_identifiers(&dir.path().join("failed_ids.txt")).unwrap();
    failed.sort();
    let expected: Vec<String> = all.iter().step_by(5).cloned().collect();
    assert_eq!(failed, expected);
}

#[tokio::test]
async fn checkpoints_flush_when_count_crosses_boundary() {
    let dir = tempdir().unwrap();
    let all = ids(&["R1", "R2", "R3", "R4", "R5"]);
    let site = FakeSite::new(all.iter().map(|id| (id.as_str(), detail_page("$5.00", &[]))).collect());
    let config = ScrapeConfig {
        batch_size: 2,
        num_workers: 1,
        checkpoint_size: 2,
    };

    let (tx, mut rx) = mpsc::channel(64);
    let service = ScrapeService::new(site, fetcher(1), writer(dir.path()), config);
    let summary = service.run_all(all.clone(), Some(tx)).await.unwrap();
    assert_eq!(summary.rows_written, 5);

    let mut flushed = Vec::new();
    let mut batches = 0;
    while let Some(event) = rx.recv().await {
        match event {
            ScrapeEvent::CheckpointSaved { rows, .. } => flushed.push(rows),
            ScrapeEvent::BatchCompleted { .. } => batches += 1,
            _ => {}
        }
    }
    assert_eq!(batches, 3);
    // Two in-run checkpoints, then the leftover row
    assert_eq!(flushed, vec![2, 2, 1]);

    let contents = std::fs::read_to_string(dir.path().join("tax_results.csv")).unwrap();
    assert_eq!(contents.matches("Property ID,Result").count(), 1);
    assert_eq!(contents.lines().count(), 6);
}

async fn checkpoint_events(total: usize, config: ScrapeConfig) -> Vec<(usize, usize)> {
    let dir = tempdir().unwrap();
    let all: Vec<String> = (1..=total).map(|i| format!("R{}", i)).collect();
    let site = FakeSite::new(all.iter().map(|id| (id.as_str(), detail_page("$5.00", &[]))).collect());

    let (tx, mut rx) = mpsc::channel(64);
    let service = ScrapeService::new(site, fetcher(1), writer(dir.path()), config);
    let summary = service.run_all(all, Some(tx)).await.unwrap();
    assert_eq!(summary.rows_written, total);

    let mut saved = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ScrapeEvent::CheckpointSaved {
            rows,
            total_processed,
        } = event
        {
            saved.push((rows, total_processed));
        }
    }
    saved
}

#[tokio::test]
async fn checkpoint_waits_for_exact_multiple() {
    let config = ScrapeConfig {
        batch_size: 3,
        num_workers: 1,
        checkpoint_size: 4,
    };

    // Totals run 3, 6, 8: only 8 is a multiple of 4
    assert_eq!(checkpoint_events(8, config).await, vec![(8, 8)]);

    // Totals run 3, 6, 7: nothing until the final drain
    assert_eq!(checkpoint_events(7, config).await, vec![(7, 7)]);
}

#[tokio::test]
async fn session_failure_aborts_run() {
    let dir = tempdir().unwrap();
    let site = FakeSite {
        refuse_sessions: true,
        ..FakeSite::new(vec![("R1", detail_page("$1.00", &[]))])
    };

    let service = ScrapeService::new(site, fetcher(1), writer(dir.path()), ScrapeConfig::default());
    let result = service.run_all(ids(&["R1"]), None).await;
    assert!(matches!(result, Err(ScrapeError::Config(_))));
}

#[tokio::test]
async fn unwritable_results_path_aborts_run() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("tax_results.csv")).unwrap();
    let site = FakeSite::new(vec![("R1", detail_page("$1.00", &[]))]);

    let service = ScrapeService::new(site, fetcher(1), writer(dir.path()), ScrapeConfig::default());
    let result = service.run_all(ids(&["R1"]), None).await;
    assert!(matches!(result, Err(ScrapeError::Io { .. })));
}

#[tokio::test]
async fn empty_input_writes_nothing() {
    let dir = tempdir().unwrap();
    let service = ScrapeService::new(
        FakeSite::default(),
        fetcher(3),
        writer(dir.path()),
        ScrapeConfig::default(),
    );
    let summary = service.run_all(Vec::new(), None).await.unwrap();

    assert!(summary.is_empty());
    assert!(!dir.path().join("tax_results.csv").exists());
    assert!(!dir.path().join("failed_ids.txt").exists());
}

#[tokio::test]
async fn scraped_results_feed_the_processor() {
    let dir = tempdir().unwrap();
    let site = FakeSite::new(vec![
        (
            "R7",
            detail_page(
                "$1,000.00",
                &[
                    ["2022", "01-10-2023", "01-10-2023", "$900.00", "A1"],
                    ["2023", "01-12-2024", "01-12-2024", "$950.00", "A2"],
                ],
            ),
        ),
        ("R8", Page::Status(404)),
    ]);

    let service = ScrapeService::new(site, fetcher(1), writer(dir.path()), ScrapeConfig::default());
    service.run_all(ids(&["R7", "R8"]), None).await.unwrap();

    let output = dir.path().join("processed_results.csv");
    let summary = process_results(&dir.path().join("tax_results.csv"), &output).unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.with_payment, 1);
    assert_eq!(summary.mean_balance, Some(1000.0));

    let contents = std::fs::read_to_string(&output).unwrap();
    assert!(contents.contains("R7,1000.0,2023,2024-01-12,2024-01-12,950.0,A2"));
}
