//! Transport seam between the retry loop and the network.

use async_trait::async_trait;

use super::http_client::HttpResponse;
use crate::error::ScrapeError;

/// A connection scope that can issue GET requests.
#[async_trait]
pub trait Session: Send + Sync {
    /// Fetch `url`. Error statuses are returned as responses, not errors;
    /// `Err` means the request itself failed (connect, timeout, body read).
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError>;
}

/// Factory for sessions; one session is opened per batch.
pub trait Transport: Send + Sync + 'static {
    type Session: Session + 'static;

    fn open_session(&self) -> Result<Self::Session, ScrapeError>;
}
