use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str =
    "https://www.e-solat.gov.my/index.php?r=esolatApi/TakwimSolat&period=year&zone=";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Apply the inter-job pause after skipped jobs too.
    #[serde(default = "default_pace_skipped")]
    pub pace_skipped: bool,
    #[serde(default = "default_volatile_fields")]
    pub volatile_fields: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            pause_ms: default_pause_ms(),
            pace_skipped: default_pace_skipped(),
            volatile_fields: default_volatile_fields(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_concurrency() -> usize {
    20
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_pause_ms() -> u64 {
    100
}
fn default_pace_skipped() -> bool {
    true
}
fn default_volatile_fields() -> Vec<String> {
    vec!["serverTime".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    #[serde(default = "default_archive")]
    pub archive: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            archive: default_archive(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_archive() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// JSON zone catalog; the embedded catalog is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path`, falling back to [`Config::minimal`] only when the file does
/// not exist and the caller did not ask for it explicitly.
pub fn load_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        tracing::debug!(path = %path.display(), "config file absent, using defaults");
        return Ok(Config::minimal());
    }
    load_config(path)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.fetch.concurrency == 0 {
        anyhow::bail!("fetch.concurrency must be >= 1");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be >= 1");
    }

    if config.fetch.base_url.trim().is_empty() {
        anyhow::bail!("fetch.base_url must not be empty");
    }

    Ok(())
}
