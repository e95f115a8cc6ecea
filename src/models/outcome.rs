//! Per-identifier scrape outcomes and their CSV cell encoding.

use serde::{Deserialize, Serialize};

/// Stored in `total_due` when the page loaded but has no total-due cell.
pub const TOTAL_DUE_NOT_FOUND: &str = "Could not find total due";

/// Stored in `payment_history` when the page has no payment history table.
pub const PAYMENT_TABLE_NOT_FOUND: &str = "Could not find payment history table";

/// Opaque key naming one property.
pub type Identifier = String;

/// One row of a property's payment history, exactly as scraped.
///
/// Encoded as a five element array `[tax_year, transaction_date,
/// effective_date, payment_amount, receipt_number]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[String; 5]", into = "[String; 5]")]
pub struct PaymentRecord {
    pub tax_year: String,
    pub transaction_date: String,
    pub effective_date: String,
    pub payment_amount: String,
    pub receipt_number: String,
}

impl From<[String; 5]> for PaymentRecord {
    fn from(cells: [String; 5]) -> Self {
        let [tax_year, transaction_date, effective_date, payment_amount, receipt_number] = cells;
        Self {
            tax_year,
            transaction_date,
            effective_date,
            payment_amount,
            receipt_number,
        }
    }
}

impl From<PaymentRecord> for [String; 5] {
    fn from(record: PaymentRecord) -> Self {
        [
            record.tax_year,
            record.transaction_date,
            record.effective_date,
            record.payment_amount,
            record.receipt_number,
        ]
    }
}

/// Payment history rows, or the marker text when the table was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentHistory {
    Rows(Vec<PaymentRecord>),
    Missing(String),
}

impl PaymentHistory {
    /// History for a page without a payment table.
    pub fn missing() -> Self {
        Self::Missing(PAYMENT_TABLE_NOT_FOUND.to_string())
    }

    /// Scraped rows, empty when the table was absent.
    pub fn rows(&self) -> &[PaymentRecord] {
        match self {
            Self::Rows(rows) => rows,
            Self::Missing(_) => &[],
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

/// Fields extracted from one property detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeData {
    pub total_due: String,
    pub payment_history: PaymentHistory,
}

impl ScrapeData {
    /// False when `total_due` holds the not-found marker.
    pub fn has_total_due(&self) -> bool {
        self.total_due != TOTAL_DUE_NOT_FOUND
    }
}

/// Final result for one identifier.
///
/// Serialized as `{"total_due": .., "payment_history": ..}` on success and
/// `{"error": ..}` on failure, so the two stay distinguishable when read back
/// from the results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Success(ScrapeData),
    Failure {
        #[serde(rename = "error")]
        reason: String,
    },
}

impl ScrapeOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn data(&self) -> Option<&ScrapeData> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Encode for the `Result` column of the results file.
    pub fn to_cell(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a `Result` column value.
    pub fn from_cell(cell: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(cell)
    }
}
