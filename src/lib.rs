//! taxscrape - concurrent property tax record scraper.
//!
//! Fetches per-property detail pages from a county tax search site, extracts
//! the total due and payment history, and checkpoints results to CSV so long
//! runs survive crashes.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod utils;

pub use error::ScrapeError;
