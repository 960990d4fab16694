//! Retry loop: run a blocking closure until success or the policy says stop.

use super::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, TransientRetry};

/// Runs `f` until it succeeds or `policy` says to stop.
/// On a retryable failure, sleeps for the delay then tries again.
/// Blocking: call from a blocking thread, never from an async task.
pub fn run_with_retry<T, F>(policy: &TransientRetry, mut f: F) -> Result<T, TransferError>
where
    F: FnMut() -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, error = %e, "transient transfer failure, retrying");
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
