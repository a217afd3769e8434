use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::classify::{DEFAULT_CONTAINER_PATTERNS, DEFAULT_IMAGE_PATTERNS};
use crate::engine::EngineConfig;

/// Retry policy parameters (optional `[download.retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per fetch (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

/// URL patterns (`host` or `host/path-prefix`) for the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub image_patterns: Vec<String>,
    pub container_patterns: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            image_patterns: DEFAULT_IMAGE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            container_patterns: DEFAULT_CONTAINER_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Reference mining in JSON bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub enabled: bool,
    /// Deeper JSON subtrees are skipped.
    pub max_depth: usize,
    /// Regex for a media identifier token.
    pub id_pattern: String,
    /// URL templates; `{id}` is replaced with the mined token. The default
    /// has no `mosaic.scdn.co/{640,300}/{id}` entries: a mosaic path names
    /// several image ids, so a single token does not address one.
    pub url_templates: Vec<String>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 64,
            id_pattern: "ab67[0-9a-f]{36}".to_string(),
            url_templates: vec!["https://i.scdn.co/image/{id}".to_string()],
        }
    }
}

/// Fetching candidates that have no captured body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub enabled: bool,
    /// Concurrent fetches.
    pub jobs: usize,
    pub user_agent: String,
    pub referer: Option<String>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Smaller bodies are treated as failures (error pages, tracking pixels).
    pub min_bytes: usize,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jobs: 4,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0 Safari/537.36".to_string(),
            referer: Some("https://open.spotify.com/".to_string()),
            connect_timeout_secs: 15,
            timeout_secs: 30,
            min_bytes: 100,
            retry: None,
        }
    }
}

/// Optional WebM → MP4 conversion of combined streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub enabled: bool,
    /// Explicit ffmpeg binary; looked up on PATH when unset.
    pub ffmpeg_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg_path: None,
            timeout_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/hmx/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HmxConfig {
    /// Root folder for `images/`, `videos/` and `data/`.
    pub output_dir: PathBuf,
    pub classifier: ClassifierConfig,
    pub mining: MiningConfig,
    pub download: DownloadConfig,
    pub transcode: TranscodeConfig,
}

impl Default for HmxConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("har_extracted"),
            classifier: ClassifierConfig::default(),
            mining: MiningConfig::default(),
            download: DownloadConfig::default(),
            transcode: TranscodeConfig::default(),
        }
    }
}

impl HmxConfig {
    /// The part of the configuration the extraction engine needs.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            classifier: self.classifier.clone(),
            mining: self.mining.enabled.then(|| self.mining.clone()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hmx")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HmxConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HmxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HmxConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
