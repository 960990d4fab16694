//! Resumable single-file HTTP transfer.
//!
//! [`Transfer`] is the seam between the fetcher and the network: one blocking
//! call materializes a URL into a file, continuing from whatever bytes the file
//! already holds. [`CurlTransfer`] is the libcurl implementation; tests plug in
//! scripted transfers.

mod curl_easy;

pub use curl_easy::CurlTransfer;

use crate::retry::TransferError;
use std::path::Path;
use std::time::Duration;

/// Downloads one URL into one file, resuming a partial file when present.
///
/// Blocking. Implementations must leave already-written bytes in place on
/// failure so the next call can resume.
pub trait Transfer: Send + Sync {
    /// Returns the number of bytes written by this call.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError>;
}

/// Options for [`CurlTransfer`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Sent as `User-Agent` on every request.
    pub user_agent: String,
    /// Extra in-transfer tries for transient failures.
    pub internal_retries: u32,
    pub internal_retry_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            user_agent: crate::config::DEFAULT_CLIENT_SIGNATURE.to_string(),
            internal_retries: 5,
            internal_retry_delay: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
        }
    }
}
