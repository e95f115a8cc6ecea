//! Page fetching, retry and field extraction.

pub mod extract;
pub mod fetch;
mod http_client;
pub mod retry;
pub mod transport;

pub use extract::{FieldExtractor, DEFAULT_PAYMENT_TABLE_ID, DEFAULT_TOTAL_DUE_ID};
pub use fetch::{PageFetcher, UrlTemplate};
pub use http_client::{resolve_user_agent, HttpClient, HttpResponse, HttpSession, DEFAULT_USER_AGENT};
pub use retry::{AttemptError, RetryDecision, RetryPolicy};
pub use transport::{Session, Transport};
