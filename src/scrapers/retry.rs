//! Fixed-delay retry policy.

use std::fmt;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp,
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Server answered with status >= 400.
    Status(u16),
    /// Request failed before a status was available, or the body could not be read.
    Transport(String),
    /// Page loaded but did not have the expected structure.
    Extract(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status={}", code),
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
            Self::Extract(msg) => write!(f, "extraction failed: {}", msg),
        }
    }
}

/// Bounded attempts with a constant delay before each one.
///
/// HTTP errors, transport errors and extraction errors all count against the
/// same ceiling. The delay never grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts; zero is treated as one.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_retries.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait applied before every attempt, including the first.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decide after attempt number `attempt` (zero-based) failed.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt + 1 < self.max_attempts {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Failure reason recorded once the attempts are used up.
    pub fn exhausted_reason(&self, error: &AttemptError) -> String {
        match error {
            AttemptError::Status(code) => format!(
                "exhausted after {} attempts, status={}",
                self.max_attempts, code
            ),
            other => format!("exhausted after {} attempts: {}", self.max_attempts, other),
        }
    }
}
