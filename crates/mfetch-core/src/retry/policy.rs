use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read, or HTTP 408).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// HTTP 4xx other than 408/429; retrying rarely helps.
    ClientError(u16),
    /// Local file could not be opened or written.
    Storage,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Failures worth retrying immediately inside one transfer.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Throttled | ErrorKind::Connection | ErrorKind::Http5xx(_)
        )
    }
}

/// Decision returned by a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Per-item policy: up to `max_attempts` whole transfers, a fixed `backoff` between them.
///
/// Every failure kind is retried unless `fail_fast_on_client_error` is set, in
/// which case a 4xx answer ends the item after the current attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Wait between attempts.
    pub backoff: Duration,
    pub fail_fast_on_client_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(10),
            fail_fast_on_client_error: false,
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when the item should be given up.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        if self.fail_fast_on_client_error && matches!(kind, ErrorKind::ClientError(_)) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff)
    }
}

/// In-transfer policy: `retries` extra tries for transient failures, `delay` apart.
#[derive(Debug, Clone, Copy)]
pub struct TransientRetry {
    pub retries: u32,
    pub delay: Duration,
}

impl TransientRetry {
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt > self.retries || !kind.is_transient() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}
