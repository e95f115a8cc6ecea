//! Data models for scraped property records.

mod outcome;

pub use outcome::{
    Identifier, PaymentHistory, PaymentRecord, ScrapeData, ScrapeOutcome,
    PAYMENT_TABLE_NOT_FOUND, TOTAL_DUE_NOT_FOUND,
};
