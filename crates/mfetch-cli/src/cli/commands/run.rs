//! `mfetch run` – download a manifest.

use anyhow::{Context, Result};
use mfetch_core::config::FetchConfig;
use mfetch_core::recorder::FailureRecorder;
use mfetch_core::transfer::Transfer;
use mfetch_core::{run_batch, run_items, ManifestOptions, RunSummary, TaskItem};
use std::path::Path;
use std::sync::Arc;

use super::progress::spawn_printer;

pub async fn run_download(cfg: &FetchConfig, manifest: &Path, in_order: bool) -> Result<()> {
    let opts = ManifestOptions {
        has_header: true,
        reverse: !in_order,
    };
    let summary = run_with_progress(cfg, manifest, opts).await?;
    print_summary(cfg, &summary);
    record_errored(cfg, &summary).await
}

pub(super) async fn run_with_progress(
    cfg: &FetchConfig,
    manifest: &Path,
    opts: ManifestOptions,
) -> Result<RunSummary> {
    let (tx, printer) = spawn_printer();
    let result = run_batch(cfg, manifest, opts, Some(tx)).await;
    // The sender went down with the batch; let the printer drain.
    let _ = printer.await;
    result
}

/// Like [`run_with_progress`] for items that are already parsed.
pub(super) async fn run_items_with_progress(
    cfg: &FetchConfig,
    items: Vec<TaskItem>,
    transfer: Arc<dyn Transfer>,
) -> Result<RunSummary> {
    let (tx, printer) = spawn_printer();
    let result = run_items(cfg, items, transfer, Some(tx)).await;
    let _ = printer.await;
    result
}

/// Appends items whose fetch aborted (worker panic, log write error) to the
/// failure log, so `retry-failed` still sees them.
pub(super) async fn record_errored(cfg: &FetchConfig, summary: &RunSummary) -> Result<()> {
    if summary.errored.is_empty() {
        return Ok(());
    }
    let recorder = FailureRecorder::new(&cfg.failed_log);
    for (item, error) in &summary.errored {
        tracing::warn!(name = item.name(), error = %error, "recording aborted item as failed");
        recorder
            .record(item)
            .await
            .with_context(|| format!("appending {} to {}", item.name(), cfg.failed_log.display()))?;
    }
    Ok(())
}

/// Failed items are not an error: they are in the failure log for a later `retry-failed`.
pub(super) fn print_summary(cfg: &FetchConfig, summary: &RunSummary) {
    println!();
    println!(
        "Download process completed: {} of {} succeeded, {} failed.",
        summary.succeeded,
        summary.total,
        summary.failed.len() + summary.errored.len()
    );
    for (item, error) in &summary.errored {
        println!("  {} was not attempted to completion: {}", item.name(), error);
    }
    if !summary.failed.is_empty() || !summary.errored.is_empty() {
        println!(
            "Check '{}' for any failed downloads; `mfetch retry-failed` re-runs them.",
            cfg.failed_log.display()
        );
    }
}
