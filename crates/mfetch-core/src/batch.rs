//! One batch run: config + manifest in, `RunSummary` out.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::FetchConfig;
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::fetcher::{FetchEvent, Fetcher};
use crate::limiter::ConcurrencyLimiter;
use crate::manifest::{read_manifest, ManifestOptions, TaskItem};
use crate::recorder::FailureRecorder;
use crate::transfer::{CurlTransfer, Transfer};

/// Reads `manifest_path` and downloads every item with libcurl.
///
/// Only setup problems (invalid config, unreadable or malformed manifest,
/// save dir not creatable) are errors; failed items are reported in the summary.
pub async fn run_batch(
    cfg: &FetchConfig,
    manifest_path: &Path,
    manifest_opts: ManifestOptions,
    events: Option<mpsc::Sender<FetchEvent>>,
) -> Result<RunSummary> {
    cfg.validate()?;
    let items = read_manifest(manifest_path, manifest_opts)
        .with_context(|| format!("manifest {}", manifest_path.display()))?;
    tracing::info!(
        manifest = %manifest_path.display(),
        items = items.len(),
        "manifest loaded"
    );
    let transfer: Arc<dyn Transfer> = Arc::new(CurlTransfer::new(cfg.transfer_options()));
    run_items(cfg, items, transfer, events).await
}

/// Downloads `items` with the given transfer. Creates the save directory.
pub async fn run_items(
    cfg: &FetchConfig,
    items: Vec<TaskItem>,
    transfer: Arc<dyn Transfer>,
    events: Option<mpsc::Sender<FetchEvent>>,
) -> Result<RunSummary> {
    cfg.validate()?;
    tokio::fs::create_dir_all(&cfg.save_dir)
        .await
        .with_context(|| format!("creating save dir {}", cfg.save_dir.display()))?;

    let mut fetcher = Fetcher::new(
        transfer,
        ConcurrencyLimiter::new(cfg.concurrency_limit),
        Arc::new(FailureRecorder::new(&cfg.failed_log)),
        cfg.retry_policy(),
        &cfg.save_dir,
    );
    if let Some(tx) = events {
        fetcher = fetcher.with_events(tx);
    }
    let summary = Dispatcher::new(Arc::new(fetcher)).run(items).await;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransfer, Step};

    fn config(dir: &Path) -> FetchConfig {
        FetchConfig {
            save_dir: dir.join("SA-1B"),
            failed_log: dir.join("async-failed.txt"),
            concurrency_limit: 2,
            max_retries: 2,
            retry_backoff_secs: 0,
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn creates_save_dir_and_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = Arc::new(ScriptedTransfer::new());
        transfer.script("https://h/a", vec![Step::Ok(b"a".to_vec())]);
        let items = vec![TaskItem::new("a", "https://h/a").unwrap()];
        let summary = run_items(&config(dir.path()), items, transfer, None).await.unwrap();
        assert!(summary.all_succeeded());
        assert!(dir.path().join("SA-1B/a").exists());
    }

    #[tokio::test]
    async fn invalid_config_rejected_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.concurrency_limit = 0;
        let transfer = Arc::new(ScriptedTransfer::new());
        assert!(run_items(&cfg, Vec::new(), transfer, None).await.is_err());
        assert!(!dir.path().join("SA-1B").exists());
    }

    #[tokio::test]
    async fn malformed_manifest_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("sa-1b.txt");
        std::fs::write(&manifest, "file_name\tcdn_link\nbroken line\n").unwrap();
        let err = run_batch(&config(dir.path()), &manifest, ManifestOptions::default(), None)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[tokio::test]
    async fn header_only_manifest_completes_with_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("sa-1b.txt");
        std::fs::write(&manifest, "file_name\tcdn_link\n").unwrap();
        let summary = run_batch(&config(dir.path()), &manifest, ManifestOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(summary.total, 0);
        assert!(!dir.path().join("async-failed.txt").exists());
    }
}
