//! CLI subcommand implementations.

mod failed;
pub(crate) mod progress;
mod run;

pub use failed::{run_list_failed, run_retry_failed};
pub use run::run_download;
