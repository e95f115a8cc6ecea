//! Field extraction from property detail pages.

use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;
use crate::models::{PaymentHistory, PaymentRecord, ScrapeData, TOTAL_DUE_NOT_FOUND};

/// Element id of the total-due cell on the detail page.
pub const DEFAULT_TOTAL_DUE_ID: &str = "dnn_ctr368_View_tdPMTotalDue";
/// Element id of the payment history table on the detail page.
pub const DEFAULT_PAYMENT_TABLE_ID: &str = "tblPaymentHistoryData";

/// Number of cells read from each payment history row.
const PAYMENT_CELLS: usize = 5;

/// Parses detail page HTML into [`ScrapeData`].
///
/// Holds only compiled selectors, so one extractor can be shared by every
/// worker and always produces the same result for the same input.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    total_due: Selector,
    payment_table: Selector,
    row: Selector,
    cell: Selector,
    link: Selector,
}

impl FieldExtractor {
    /// Build an extractor for the given element ids.
    pub fn new(total_due_id: &str, payment_table_id: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            total_due: parse_selector(&format!("td#{}", total_due_id))?,
            payment_table: parse_selector(&format!("table#{}", payment_table_id))?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            link: parse_selector("a")?,
        })
    }

    /// Extractor for the default page layout.
    pub fn standard() -> Result<Self, ScrapeError> {
        Self::new(DEFAULT_TOTAL_DUE_ID, DEFAULT_PAYMENT_TABLE_ID)
    }

    /// Extract the total due and payment history from a page.
    ///
    /// Missing elements become marker values. Only a payment row with too
    /// few cells is an error.
    pub fn extract(&self, html: &str) -> Result<ScrapeData, ScrapeError> {
        let document = Html::parse_document(html);

        let total_due = document
            .select(&self.total_due)
            .next()
            .map(|cell| element_text(&cell))
            .unwrap_or_else(|| TOTAL_DUE_NOT_FOUND.to_string());

        let payment_history = match document.select(&self.payment_table).next() {
            Some(table) => PaymentHistory::Rows(self.payment_rows(table)?),
            None => PaymentHistory::missing(),
        };

        Ok(ScrapeData {
            total_due,
            payment_history,
        })
    }

    fn payment_rows(&self, table: ElementRef<'_>) -> Result<Vec<PaymentRecord>, ScrapeError> {
        let mut records = Vec::new();

        // First row is the header
        for (index, row) in table.select(&self.row).enumerate().skip(1) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() < PAYMENT_CELLS {
                return Err(ScrapeError::Shape(format!(
                    "payment history row {} has {} cells, expected {}",
                    index,
                    cells.len(),
                    PAYMENT_CELLS
                )));
            }

            let receipt_cell = &cells[4];
            let receipt_number = match receipt_cell.select(&self.link).next() {
                Some(link) => element_text(&link),
                None => element_text(receipt_cell),
            };

            records.push(PaymentRecord {
                tax_year: element_text(&cells[0]),
                transaction_date: element_text(&cells[1]),
                effective_date: element_text(&cells[2]),
                payment_amount: element_text(&cells[3]),
                receipt_number,
            });
        }

        Ok(records)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector(format!("{}: {}", selector, e)))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
