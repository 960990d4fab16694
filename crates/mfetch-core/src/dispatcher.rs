//! Fans a fixed item list out to the fetcher and waits for every item.
//!
//! All items are spawned up front on a `JoinSet`; the fetcher's limiter decides
//! how many actually download at once. A fetch that errors or panics is
//! recorded against its item and does not stop the others.

use crate::fetcher::{FetchOutcome, Fetcher};
use crate::manifest::TaskItem;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What happened to every item of one run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Retries exhausted; these are in the failure log.
    pub failed: Vec<TaskItem>,
    /// Unexpected per-item errors (worker panic, unwritable failure log).
    pub errored: Vec<(TaskItem, String)>,
}

impl RunSummary {
    /// True when every item downloaded.
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

pub struct Dispatcher {
    fetcher: Arc<Fetcher>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Runs every item to a terminal state and returns the tally.
    pub async fn run(&self, items: Vec<TaskItem>) -> RunSummary {
        let mut summary = RunSummary {
            total: items.len(),
            ..RunSummary::default()
        };
        if items.is_empty() {
            tracing::info!("manifest is empty, nothing to download");
            return summary;
        }
        tracing::info!(
            items = items.len(),
            concurrency = self.fetcher.limiter().capacity(),
            "dispatching downloads"
        );

        // Items whose task has not reported back; anything left after the join loop panicked.
        let mut pending: BTreeMap<usize, TaskItem> = BTreeMap::new();
        let mut join_set = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let task_item = item.clone();
            pending.insert(index, item);
            join_set.spawn(async move {
                let result = fetcher.fetch(&task_item).await;
                (index, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = %e, "fetch task did not finish");
                    continue;
                }
            };
            let Some(item) = pending.remove(&index) else {
                continue;
            };
            match result {
                Ok(FetchOutcome::Succeeded { .. }) => summary.succeeded += 1,
                Ok(FetchOutcome::Failed { .. }) => summary.failed.push(item),
                Err(e) => {
                    tracing::error!(name = item.name(), error = %e, "fetch aborted");
                    summary.errored.push((item, e.to_string()));
                }
            }
        }

        for (_, item) in pending {
            summary.errored.push((item, "fetch task panicked".to_string()));
        }

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            errored = summary.errored.len(),
            "all downloads finished"
        );
        summary
    }
}
