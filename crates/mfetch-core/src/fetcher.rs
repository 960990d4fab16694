//! Downloads one manifest item with bounded retries.
//!
//! The item holds one limiter slot for its whole retry sequence, so the
//! concurrency limit counts items, not attempts. Exhausted items go to the
//! failure log; partial output stays on disk for the next run to resume.

use crate::limiter::ConcurrencyLimiter;
use crate::manifest::TaskItem;
use crate::recorder::FailureRecorder;
use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::transfer::Transfer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Progress notifications, one per attempt boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    AttemptStarted { name: String, attempt: u32 },
    AttemptFailed { name: String, attempt: u32, error: String },
    Succeeded { name: String, attempts: u32, bytes: u64 },
    /// Retries exhausted; the item has been written to the failure log.
    Exhausted { name: String, attempts: u32 },
}

/// Terminal state of a fetch that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `bytes` counts what the final attempt wrote (0 when already complete).
    Succeeded { attempts: u32, bytes: u64 },
    Failed { attempts: u32, last_error: String },
}

impl FetchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Succeeded { attempts, .. } | FetchOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Failures outside the modeled retry path. The item's outcome is unknown.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("concurrency limiter closed")]
    LimiterClosed(#[from] tokio::sync::AcquireError),
    #[error("transfer worker for {name} did not finish: {source}")]
    Worker {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("cannot append to failure log {}: {source}", .path.display())]
    FailureLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct Fetcher {
    transfer: Arc<dyn Transfer>,
    limiter: ConcurrencyLimiter,
    recorder: Arc<FailureRecorder>,
    policy: RetryPolicy,
    save_dir: PathBuf,
    events: Option<mpsc::Sender<FetchEvent>>,
}

impl Fetcher {
    pub fn new(
        transfer: Arc<dyn Transfer>,
        limiter: ConcurrencyLimiter,
        recorder: Arc<FailureRecorder>,
        policy: RetryPolicy,
        save_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transfer,
            limiter,
            recorder,
            policy,
            save_dir: save_dir.into(),
            events: None,
        }
    }

    /// Send progress events to `tx`. Events are dropped if the receiver is gone.
    pub fn with_events(mut self, tx: mpsc::Sender<FetchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Output path of `item`: `save_dir/name`.
    pub fn dest_path(&self, item: &TaskItem) -> PathBuf {
        self.save_dir.join(item.name())
    }

    /// Downloads `item`, retrying per policy. Exhaustion is `Ok(FetchOutcome::Failed)`.
    pub async fn fetch(&self, item: &TaskItem) -> Result<FetchOutcome, FetchError> {
        let name = item.name().to_string();
        let dest = self.dest_path(item);
        let permit = self.limiter.acquire().await?;

        let mut attempt = 1u32;
        let last_error = loop {
            tracing::info!(name = %name, attempt, "downloading");
            self.emit(FetchEvent::AttemptStarted {
                name: name.clone(),
                attempt,
            })
            .await;

            let transfer = Arc::clone(&self.transfer);
            let url = item.url().to_string();
            let path = dest.clone();
            let result = tokio::task::spawn_blocking(move || transfer.download(&url, &path))
                .await
                .map_err(|source| FetchError::Worker {
                    name: name.clone(),
                    source,
                })?;

            match result {
                Ok(bytes) => {
                    tracing::info!(name = %name, attempt, bytes, "download complete");
                    self.emit(FetchEvent::Succeeded {
                        name: name.clone(),
                        attempts: attempt,
                        bytes,
                    })
                    .await;
                    return Ok(FetchOutcome::Succeeded {
                        attempts: attempt,
                        bytes,
                    });
                }
                Err(e) => {
                    tracing::warn!(name = %name, attempt, error = %e, "attempt failed");
                    self.emit(FetchEvent::AttemptFailed {
                        name: name.clone(),
                        attempt,
                        error: e.to_string(),
                    })
                    .await;
                    match self.policy.decide(attempt, classify(&e)) {
                        RetryDecision::NoRetry => break e.to_string(),
                        RetryDecision::RetryAfter(delay) => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                    }
                }
            }
        };

        drop(permit);
        tracing::error!(name = %name, attempts = attempt, error = %last_error, "giving up");
        self.recorder
            .record(item)
            .await
            .map_err(|source| FetchError::FailureLog {
                path: self.recorder.path().to_path_buf(),
                source,
            })?;
        self.emit(FetchEvent::Exhausted {
            name,
            attempts: attempt,
        })
        .await;
        Ok(FetchOutcome::Failed {
            attempts: attempt,
            last_error,
        })
    }

    async fn emit(&self, event: FetchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
