//! Retry and backoff policy.
//!
//! Two layers share one error classification:
//! - [`RetryPolicy`]: attempts per manifest item with a fixed backoff, applied
//!   by the fetcher around whole transfers.
//! - [`TransientRetry`]: quick in-transfer retries for transient network
//!   failures (timeouts, resets, 408/429/5xx), applied inside the transfer.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy, TransientRetry};
pub use run::run_with_retry;
