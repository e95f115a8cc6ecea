//! Service layer for scraping and result processing.
//!
//! Services can be used by the CLI or other interfaces.

pub mod process;
pub mod scrape;

pub use process::{process_results, ProcessSummary, ProcessedRecord};
pub use scrape::{partition, RunSummary, ScrapeConfig, ScrapeEvent, ScrapeService};
