use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::transfer::TransferOptions;

/// Browser-like signature sent as `User-Agent`; some CDNs reject curl's default.
pub const DEFAULT_CLIENT_SIGNATURE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Per-request behaviour of the HTTP transfer (optional `[transfer]` section).
/// Keys left out of the section keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Extra tries the transfer makes on its own before reporting a failed attempt.
    pub internal_retries: u32,
    /// Delay in seconds between internal tries.
    pub internal_retry_delay_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            internal_retries: 5,
            internal_retry_delay_secs: 10,
            connect_timeout_secs: 30,
        }
    }
}

/// Failure classification knobs (optional `[retry]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Stop retrying an item after an HTTP 4xx (other than 408/429).
    /// Off by default: every failure is retried up to `max_retries`.
    #[serde(default)]
    pub fail_fast_on_client_error: bool,
}

/// Global configuration loaded from `~/.config/mfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Directory that receives one file per manifest item.
    pub save_dir: PathBuf,
    /// Append-only log of items whose retries were exhausted.
    pub failed_log: PathBuf,
    /// Maximum number of items downloading at once.
    pub concurrency_limit: usize,
    /// Attempts per item (including the first).
    pub max_retries: u32,
    /// Fixed wait between attempts of one item, in seconds.
    pub retry_backoff_secs: u64,
    /// Value of the `User-Agent` header on every request.
    pub client_signature: String,
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("SA-1B"),
            failed_log: PathBuf::from("async-failed.txt"),
            concurrency_limit: 10,
            max_retries: 5,
            retry_backoff_secs: 10,
            client_signature: DEFAULT_CLIENT_SIGNATURE.to_string(),
            transfer: None,
            retry: None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency_limit must be at least 1")]
    ZeroConcurrency,
    #[error("max_retries must be at least 1")]
    ZeroRetries,
    #[error("client_signature must not contain line breaks")]
    BadSignature,
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.client_signature.contains(|c: char| c == '\r' || c == '\n') {
            return Err(ConfigError::BadSignature);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            backoff: Duration::from_secs(self.retry_backoff_secs),
            fail_fast_on_client_error: self
                .retry
                .as_ref()
                .map(|r| r.fail_fast_on_client_error)
                .unwrap_or(false),
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        let t = self.transfer.clone().unwrap_or_default();
        TransferOptions {
            user_agent: self.client_signature.clone(),
            internal_retries: t.internal_retries,
            internal_retry_delay: Duration::from_secs(t.internal_retry_delay_secs),
            connect_timeout: Duration::from_secs(t.connect_timeout_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file (no defaults written).
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: FetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
