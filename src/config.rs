use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_FILE: &str = ".env";

/// Overrides `source.base_url`.
pub const FEED_ADDR_VAR: &str = "FEED_ADDR";
/// Overrides `store.base_url`.
pub const STORE_ADDR_VAR: &str = "STORE_ADDR";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Capacity of the stage-to-stage channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Fetched events held between the fetch and transform tasks.
    #[serde(default = "default_transform_buffer")]
    pub transform_buffer: usize,
}

fn default_source_url() -> String { "http://localhost:8000".to_string() }
fn default_store_url() -> String { "http://localhost:8001".to_string() }
fn default_poll_interval_ms() -> u64 { 5000 }
fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_channel_capacity() -> usize { 1 }
fn default_transform_buffer() -> usize { 16 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            transform_buffer: default_transform_buffer(),
        }
    }
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply FEED_ADDR / STORE_ADDR from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(FEED_ADDR_VAR).map(|v| sanitize(&v)).filter(|v| !v.is_empty()) {
            self.source.base_url = url;
        }
        if let Some(url) = lookup(STORE_ADDR_VAR).map(|v| sanitize(&v)).filter(|v| !v.is_empty()) {
            self.store.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.is_empty() {
            anyhow::bail!("source.base_url cannot be empty");
        }
        if self.store.base_url.is_empty() {
            anyhow::bail!("store.base_url cannot be empty");
        }
        if self.source.poll_interval_ms == 0 {
            anyhow::bail!("source.poll_interval_ms must be > 0");
        }
        if self.pipeline.channel_capacity == 0 || self.pipeline.transform_buffer == 0 {
            anyhow::bail!("pipeline channel capacities must be > 0");
        }
        Ok(())
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env_lines(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// KEY=VALUE pairs from .env content. Blank lines and `#` comments are skipped.
fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a value.
fn sanitize(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
