//! Fetch-with-retry for a single identifier.

use tracing::{debug, warn};

use super::extract::FieldExtractor;
use super::retry::{AttemptError, RetryDecision, RetryPolicy};
use super::transport::Session;
use crate::error::ScrapeError;
use crate::models::{ScrapeData, ScrapeOutcome};

/// Placeholder replaced by the identifier in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Detail page URL template, e.g. `https://host/Property-Detail/PropertyQuickRefID/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ScrapeError> {
        let template = template.into();
        if !template.contains(ID_PLACEHOLDER) {
            return Err(ScrapeError::Config(format!(
                "URL template '{}' has no {} placeholder",
                template, ID_PLACEHOLDER
            )));
        }
        Ok(Self(template))
    }

    /// URL for one identifier. The identifier is percent-encoded.
    pub fn resolve(&self, id: &str) -> String {
        self.0.replace(ID_PLACEHOLDER, &urlencoding::encode(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fetches and extracts one property page, retrying per [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    urls: UrlTemplate,
    extractor: FieldExtractor,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(urls: UrlTemplate, extractor: FieldExtractor, policy: RetryPolicy) -> Self {
        Self {
            urls,
            extractor,
            policy,
        }
    }

    /// Fetch `id` through `session`.
    ///
    /// Never fails: every error path ends in [`ScrapeOutcome::Failure`].
    pub async fn fetch<S>(&self, session: &S, id: &str) -> (String, ScrapeOutcome)
    where
        S: Session + ?Sized,
    {
        let url = self.urls.resolve(id);
        let mut attempt = 0;

        loop {
            tokio::time::sleep(self.policy.delay()).await;

            let error = match self.attempt(session, &url).await {
                Ok(data) => {
                    debug!("Fetched {} on attempt {}", id, attempt + 1);
                    return (id.to_string(), ScrapeOutcome::Success(data));
                }
                Err(e) => e,
            };

            match self.policy.decide(attempt) {
                RetryDecision::Retry => {
                    debug!("Attempt {} for {} failed ({}), retrying", attempt + 1, id, error);
                    attempt += 1;
                }
                RetryDecision::GiveUp => {
                    let reason = self.policy.exhausted_reason(&error);
                    warn!("Giving up on {}: {}", id, reason);
                    return (id.to_string(), ScrapeOutcome::failure(reason));
                }
            }
        }
    }

    async fn attempt<S>(&self, session: &S, url: &str) -> Result<ScrapeData, AttemptError>
    where
        S: Session + ?Sized,
    {
        let response = session
            .get(url)
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        if response.is_error() {
            return Err(AttemptError::Status(response.status));
        }

        self.extractor
            .extract(&response.body)
            .map_err(|e| AttemptError::Extract(e.to_string()))
    }
}
