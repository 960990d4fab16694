pub mod config;
pub mod logging;

pub mod batch;
pub mod dispatcher;
pub mod fetcher;
pub mod limiter;
pub mod manifest;
pub mod recorder;
pub mod retry;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{run_batch, run_items};
pub use config::FetchConfig;
pub use dispatcher::{Dispatcher, RunSummary};
pub use fetcher::{FetchError, FetchEvent, FetchOutcome, Fetcher};
pub use manifest::{ManifestOptions, TaskItem};
