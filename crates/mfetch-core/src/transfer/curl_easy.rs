//! libcurl `Easy` transfer with resume (`Range: bytes=N-`) and in-transfer retries.

use super::{Transfer, TransferOptions};
use crate::retry::{run_with_retry, TransferError, TransientRetry};
use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Resumable HTTP GET over libcurl.
#[derive(Debug, Clone)]
pub struct CurlTransfer {
    opts: TransferOptions,
}

impl CurlTransfer {
    pub fn new(opts: TransferOptions) -> Self {
        Self { opts }
    }

    fn transient_policy(&self) -> TransientRetry {
        TransientRetry {
            retries: self.opts.internal_retries,
            delay: self.opts.internal_retry_delay,
        }
    }

    /// One request. Appends the body to `dest`, starting at its current length.
    fn download_once(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dest)
            .map_err(TransferError::Storage)?;
        let offset = file.metadata().map_err(TransferError::Storage)?.len();

        match self.perform(url, &file, offset) {
            // Server ignored the range request: the partial bytes are unusable, start over.
            Err(TransferError::Curl(e)) if e.is_range_error() && offset > 0 => {
                tracing::info!(dest = %dest.display(), offset, "server cannot resume, restarting from zero");
                file.set_len(0).map_err(TransferError::Storage)?;
                self.perform(url, &file, 0)
            }
            other => other,
        }
    }

    fn perform(&self, url: &str, file: &File, offset: u64) -> Result<u64, TransferError> {
        let written = Cell::new(0u64);
        let status = Cell::new(0u32);
        let storage_error: RefCell<Option<std::io::Error>> = RefCell::new(None);
        let mut out = file;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.useragent(&self.opts.user_agent)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        // Abort if throughput drops below 1 KiB/s for 60s instead of a wall-clock limit.
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        if offset > 0 {
            easy.resume_from(offset)?;
        }

        let perform_result = {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                // Last status line wins when redirects are followed.
                if let Some(code) = parse_status_line(line) {
                    status.set(code);
                }
                true
            })?;
            transfer.write_function(|data| {
                // Error pages are drained, never written into the output file.
                if !(200..300).contains(&status.get()) {
                    return Ok(data.len());
                }
                match out.write_all(data) {
                    Ok(()) => {
                        written.set(written.get() + data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        storage_error.borrow_mut().replace(e);
                        Ok(0)
                    }
                }
            })?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if e.is_write_error() {
                if let Some(io_err) = storage_error.borrow_mut().take() {
                    return Err(TransferError::Storage(io_err));
                }
            }
            return Err(TransferError::Curl(e));
        }

        let code = easy.response_code()?;
        // 416 on a resume means the file is already complete.
        if code == 416 && offset > 0 {
            return Ok(0);
        }
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        out.flush().map_err(TransferError::Storage)?;
        Ok(written.get())
    }
}

impl Default for CurlTransfer {
    fn default() -> Self {
        Self::new(TransferOptions::default())
    }
}

impl Transfer for CurlTransfer {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        run_with_retry(&self.transient_policy(), || self.download_once(url, dest))
    }
}

/// Parses `HTTP/1.1 206 Partial Content` (or `HTTP/2 200`) into the status code.
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
