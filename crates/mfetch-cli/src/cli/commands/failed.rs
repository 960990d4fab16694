//! `mfetch failed` and `mfetch retry-failed` – work with the failure log.

use anyhow::{Context, Result};
use mfetch_core::config::FetchConfig;
use mfetch_core::manifest::{read_manifest, ManifestOptions};
use mfetch_core::transfer::{CurlTransfer, Transfer};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::run::{print_summary, record_errored, run_items_with_progress};

/// The failure log has no header and is replayed in the order failures happened.
const LOG_AS_MANIFEST: ManifestOptions = ManifestOptions {
    has_header: false,
    reverse: false,
};

pub fn run_list_failed(path: &Path) -> Result<()> {
    if !path.exists() {
        println!("No failed downloads recorded ({} does not exist).", path.display());
        return Ok(());
    }
    let items = read_manifest(path, LOG_AS_MANIFEST)
        .with_context(|| format!("failure log {}", path.display()))?;
    for item in &items {
        println!("{}\t{}", item.name(), item.url());
    }
    println!("{} failed item(s) in {}", items.len(), path.display());
    Ok(())
}

fn with_suffix(log: &Path, suffix: &str) -> PathBuf {
    let mut o = log.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

/// Where the current log is moved before a retry run: `<log>.prev`, or
/// `<log>.prev.N` with the smallest free N once that is taken.
pub(crate) fn next_rotation_path(log: &Path) -> PathBuf {
    let prev = with_suffix(log, ".prev");
    if !prev.exists() {
        return prev;
    }
    (1u32..)
        .map(|n| with_suffix(log, &format!(".prev.{}", n)))
        .find(|p| !p.exists())
        .unwrap_or(prev)
}

pub async fn run_retry_failed(cfg: &FetchConfig) -> Result<()> {
    let transfer: Arc<dyn Transfer> = Arc::new(CurlTransfer::new(cfg.transfer_options()));
    retry_failed_with(cfg, transfer).await
}

/// Replays the failure log. Nothing is moved until the config, the log and the
/// save dir have all been checked; new failures go to a fresh log.
async fn retry_failed_with(cfg: &FetchConfig, transfer: Arc<dyn Transfer>) -> Result<()> {
    cfg.validate()?;
    let log = &cfg.failed_log;
    let is_empty = match std::fs::metadata(log) {
        Ok(m) => m.len() == 0,
        Err(_) => true,
    };
    if is_empty {
        println!("No failed downloads recorded in {}.", log.display());
        return Ok(());
    }
    let items = read_manifest(log, LOG_AS_MANIFEST)
        .with_context(|| format!("failure log {}", log.display()))?;
    tokio::fs::create_dir_all(&cfg.save_dir)
        .await
        .with_context(|| format!("creating save dir {}", cfg.save_dir.display()))?;

    let rotated = next_rotation_path(log);
    std::fs::rename(log, &rotated)
        .with_context(|| format!("moving {} to {}", log.display(), rotated.display()))?;
    tracing::info!(from = %log.display(), to = %rotated.display(), "rotated failure log for retry");

    let summary = match run_items_with_progress(cfg, items, transfer).await {
        Ok(summary) => summary,
        Err(e) => {
            if let Err(restore) = restore_rotated(log, &rotated) {
                tracing::error!(
                    log = %rotated.display(),
                    error = %restore,
                    "could not move the failure log back"
                );
            }
            return Err(e);
        }
    };
    print_summary(cfg, &summary);
    record_errored(cfg, &summary).await
}

/// Puts a rotated log back after a run that did not start. Anything the run
/// already wrote to `log` is kept and the old entries go in front of it.
fn restore_rotated(log: &Path, rotated: &Path) -> std::io::Result<()> {
    if !log.exists() {
        return std::fs::rename(rotated, log);
    }
    let mut merged = std::fs::read(rotated)?;
    merged.extend(std::fs::read(log)?);
    let mut file = std::fs::File::create(log)?;
    file.write_all(&merged)?;
    file.flush()?;
    std::fs::remove_file(rotated)
}
