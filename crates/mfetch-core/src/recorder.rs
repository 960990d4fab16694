//! Append-only log of items whose retries were exhausted.
//!
//! One `name\turl\n` line per failed item. Appends are serialized by an async
//! mutex held across open+write+flush, so concurrent failures never interleave.

use crate::manifest::TaskItem;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct FailureRecorder {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FailureRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line for `item`. Never truncates the log.
    pub async fn record(&self, item: &TaskItem) -> io::Result<()> {
        let line = format!("{}\t{}\n", item.name(), item.url());
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        tracing::debug!(name = item.name(), log = %self.path.display(), "recorded failure");
        Ok(())
    }
}
