//! Fetching candidates that have no captured body.
//!
//! One blocking curl GET per URL with retry; `fetch_all` fans a batch out on
//! blocking tasks, a bounded number at a time.

mod fetch;
mod parallel;

use std::time::Duration;

use crate::config::DownloadConfig;
use crate::retry::RetryPolicy;

pub use fetch::fetch;
pub use parallel::fetch_all;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    /// Body shorter than the configured minimum (error pages, tracking pixels).
    #[error("body too small: {received} bytes (minimum {min})")]
    TooSmall { received: usize, min: usize },
}

/// Per-request settings, built from `[download]` config.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub user_agent: String,
    pub referer: Option<String>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub min_bytes: usize,
    pub retry: RetryPolicy,
}

impl From<&DownloadConfig> for DownloadOptions {
    fn from(cfg: &DownloadConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            referer: cfg.referer.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            min_bytes: cfg.min_bytes,
            retry: cfg
                .retry
                .as_ref()
                .map(RetryPolicy::from)
                .unwrap_or_default(),
        }
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
