//! CLI for the mfetch bulk downloader.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mfetch_core::config::{self, FetchConfig};
use std::path::PathBuf;

use commands::{run_download, run_list_failed, run_retry_failed};

/// Top-level CLI for mfetch.
#[derive(Debug, Parser)]
#[command(name = "mfetch")]
#[command(about = "mfetch: bounded-concurrency bulk downloads from a name/URL manifest", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/mfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-run overrides of config file values.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOverrides {
    /// Directory that receives the downloaded files.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Append-only log of items that failed every attempt.
    #[arg(long, value_name = "FILE")]
    pub failed_log: Option<PathBuf>,

    /// Download up to N items at once.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Attempts per item before it is logged as failed.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Seconds to wait between attempts of one item.
    #[arg(long, value_name = "SECS")]
    pub backoff: Option<u64>,

    /// User-Agent sent with every request.
    #[arg(long, value_name = "STRING")]
    pub user_agent: Option<String>,
}

impl RunOverrides {
    pub fn apply(&self, cfg: &mut FetchConfig) {
        if let Some(dir) = &self.save_dir {
            cfg.save_dir = dir.clone();
        }
        if let Some(log) = &self.failed_log {
            cfg.failed_log = log.clone();
        }
        if let Some(jobs) = self.jobs {
            cfg.concurrency_limit = jobs;
        }
        if let Some(retries) = self.retries {
            cfg.max_retries = retries;
        }
        if let Some(backoff) = self.backoff {
            cfg.retry_backoff_secs = backoff;
        }
        if let Some(ua) = &self.user_agent {
            cfg.client_signature = ua.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every item of a manifest (`name<TAB>url`, one header line).
    Run {
        /// Manifest file.
        #[arg(default_value = "sa-1b.txt")]
        manifest: PathBuf,

        /// Dispatch items in file order instead of last-line-first.
        #[arg(long)]
        in_order: bool,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Re-run the items in the failure log. The old log is kept as `<log>.prev`.
    RetryFailed {
        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// List the items in the failure log.
    Failed {
        /// Failure log to read (default from config).
        #[arg(long, value_name = "FILE")]
        failed_log: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<FetchConfig> {
    match path {
        Some(p) => config::load_from_path(p).with_context(|| format!("config {}", p.display())),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = load_config(cli.config.as_ref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                manifest,
                in_order,
                overrides,
            } => {
                overrides.apply(&mut cfg);
                run_download(&cfg, &manifest, in_order).await?;
            }
            CliCommand::RetryFailed { overrides } => {
                overrides.apply(&mut cfg);
                run_retry_failed(&cfg).await?;
            }
            CliCommand::Failed { failed_log } => {
                let path = failed_log.unwrap_or(cfg.failed_log);
                run_list_failed(&path)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
