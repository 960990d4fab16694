//! Scripted in-memory transfer for fetcher and dispatcher tests.

use crate::retry::TransferError;
use crate::transfer::Transfer;
use std::collections::{HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What one `download` call does.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Append the bytes and succeed.
    Ok(Vec<u8>),
    /// Fail with this HTTP status without writing.
    Fail(u32),
    /// Append the bytes, then fail as if the body was cut short.
    Partial(Vec<u8>),
    Panic,
}

/// Replays per-URL scripts; unscripted calls fail with HTTP 500.
/// Tracks how many downloads overlap.
pub(crate) struct ScriptedTransfer {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hold: Duration,
}

impl ScriptedTransfer {
    pub(crate) fn new() -> Self {
        Self::with_hold(Duration::ZERO)
    }

    /// Each call sleeps `hold` so overlapping downloads are observable.
    pub(crate) fn with_hold(hold: Duration) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hold,
        }
    }

    pub(crate) fn script(&self, url: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
    }

    pub(crate) fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn append(dest: &Path, data: &[u8]) -> Result<u64, TransferError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dest)
            .map_err(TransferError::Storage)?;
        f.write_all(data).map_err(TransferError::Storage)?;
        Ok(data.len() as u64)
    }
}

impl Transfer for ScriptedTransfer {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        std::thread::sleep(self.hold);
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|s| s.pop_front())
            .unwrap_or(Step::Fail(500));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match step {
            Step::Ok(data) => Self::append(dest, &data),
            Step::Fail(code) => Err(TransferError::Http(code)),
            Step::Partial(data) => {
                Self::append(dest, &data)?;
                Err(TransferError::Storage(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset mid-body",
                )))
            }
            Step::Panic => panic!("scripted transfer panic for {}", url),
        }
    }
}
