//! reqwest-backed transport.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, DEFAULT_USER_AGENT};

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Client;

use super::transport::{Session, Transport};
use crate::error::ScrapeError;

/// HTTP transport with a fixed header set.
///
/// Every [`Transport::open_session`] call builds a fresh `reqwest::Client`,
/// so connection pools are never shared across batches or workers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a client sending `user_agent` plus any extra headers.
    pub fn new(
        user_agent: Option<&str>,
        extra_headers: &BTreeMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        let agent = resolve_user_agent(user_agent);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent)
                .map_err(|e| ScrapeError::Config(format!("invalid user agent: {}", e)))?,
        );

        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScrapeError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ScrapeError::Config(format!("invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        Ok(Self { headers, timeout })
    }

    /// Headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Per-request timeout, `None` when requests may wait indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Transport for HttpClient {
    type Session = HttpSession;

    fn open_session(&self) -> Result<HttpSession, ScrapeError> {
        let mut builder = Client::builder()
            .default_headers(self.headers.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(HttpSession { client })
    }
}

/// One connection pool, used for a single batch.
pub struct HttpSession {
    client: Client,
}

#[async_trait]
impl Session for HttpSession {
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        if status >= 400 {
            return Ok(HttpResponse::new(status, String::new()));
        }

        let body = response.text().await?;
        Ok(HttpResponse::new(status, body))
    }
}
