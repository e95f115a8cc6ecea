//! Results post-processing.
//!
//! Turns the raw results file into an analytic table: total due as a number
//! and the most recent dated payment per property.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::models::{PaymentRecord, ScrapeOutcome};

/// Date format used by the payment history table.
pub const PAYMENT_DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Property ID")]
    property_id: String,
    #[serde(rename = "Result")]
    result: String,
}

/// One row of the processed table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessedRecord {
    #[serde(rename = "Property ID")]
    pub property_id: String,
    #[serde(rename = "Total Due")]
    pub total_due: Option<f64>,
    #[serde(rename = "Latest Tax Year")]
    pub latest_tax_year: Option<String>,
    #[serde(rename = "Transaction Date")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(rename = "Effective Date")]
    pub effective_date: Option<NaiveDate>,
    #[serde(rename = "Payment Amount")]
    pub payment_amount: Option<f64>,
    #[serde(rename = "Receipt Number")]
    pub receipt_number: Option<String>,
}

impl ProcessedRecord {
    /// Build the processed row for one raw result cell.
    ///
    /// Cells that fail to decode, and failed scrapes, produce a row with only
    /// the property id set.
    pub fn from_cell(property_id: &str, cell: &str) -> Self {
        let mut record = Self {
            property_id: property_id.to_string(),
            ..Default::default()
        };

        let outcome = match ScrapeOutcome::from_cell(cell) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Could not parse result for {}: {}", property_id, e);
                return record;
            }
        };
        let Some(data) = outcome.data() else {
            return record;
        };

        if data.has_total_due() {
            record.total_due = parse_currency(&data.total_due);
        }

        if let Some((date, latest)) = latest_payment(data.payment_history.rows()) {
            record.latest_tax_year = non_empty(&latest.tax_year);
            record.transaction_date = Some(date);
            record.effective_date = parse_payment_date(&latest.effective_date);
            record.payment_amount = parse_currency(&latest.payment_amount);
            record.receipt_number = non_empty(&latest.receipt_number);
        }

        record
    }
}

/// Totals reported after processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSummary {
    pub rows: usize,
    /// Rows with a latest payment amount.
    pub with_payment: usize,
    /// Rows with a numeric total due.
    pub with_balance: usize,
    pub mean_balance: Option<f64>,
}

impl ProcessSummary {
    fn from_records(records: &[ProcessedRecord]) -> Self {
        let balances: Vec<f64> = records.iter().filter_map(|r| r.total_due).collect();
        let mean_balance = if balances.is_empty() {
            None
        } else {
            Some(balances.iter().sum::<f64>() / balances.len() as f64)
        };

        Self {
            rows: records.len(),
            with_payment: records.iter().filter(|r| r.payment_amount.is_some()).count(),
            with_balance: balances.len(),
            mean_balance,
        }
    }
}

/// Parse `"$1,234.56"` style amounts. Markers and unparseable text give `None`.
pub fn parse_currency(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == "N/A" {
        return None;
    }
    text.replace(['$', ','], "").trim().parse().ok()
}

pub fn parse_payment_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), PAYMENT_DATE_FORMAT).ok()
}

/// Most recent payment by transaction date; rows without a parseable date
/// are ignored. On equal dates the later row wins.
pub fn latest_payment(rows: &[PaymentRecord]) -> Option<(NaiveDate, &PaymentRecord)> {
    rows.iter()
        .filter_map(|row| parse_payment_date(&row.transaction_date).map(|date| (date, row)))
        .max_by_key(|(date, _)| *date)
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Process `input` (raw results CSV) into `output`.
///
/// A missing input file is an error for the caller to report; an input with
/// only a header produces an empty table.
pub fn process_results(input: &Path, output: &Path) -> Result<ProcessSummary, ScrapeError> {
    let mut reader = csv::Reader::from_path(input)?;
    let mut records = Vec::new();

    for row in reader.deserialize::<RawRow>() {
        let row = row?;
        records.push(ProcessedRecord::from_cell(&row.property_id, &row.result));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(output)?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|e| ScrapeError::io(output, e))?;

    let summary = ProcessSummary::from_records(&records);
    info!(
        "Processed {} records from {} into {}",
        summary.rows,
        input.display(),
        output.display()
    );
    Ok(summary)
}
