use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::candidate::MimeKind;

/// How `start_all` spreads work over the concurrency bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// Fixed chunks of `max_concurrent`; a chunk fully settles before the next starts.
    #[default]
    Chunked,
    /// Bounded pool: a new transfer starts as soon as any in-flight one settles.
    Pool,
}

/// Orchestrator limits and behavior (`[orchestrator]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of tasks held at once.
    pub max_tasks: usize,
    /// Largest accepted file in bytes.
    pub max_file_size_bytes: u64,
    /// Accepted MIME types (empty = any).
    pub allowed_mime_types: Vec<String>,
    /// Accepted extensions without the dot, case-insensitive (empty = any).
    pub allowed_extensions: Vec<String>,
    /// Accepted payload kinds (empty = any).
    pub allowed_kinds: Vec<MimeKind>,
    /// Start uploading accepted files as part of `enqueue`.
    pub auto_start: bool,
    /// Maximum concurrent transfers. Values below 1 are treated as 1.
    pub max_concurrent: usize,
    pub dispatch: DispatchStrategy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tasks: 10,
            max_file_size_bytes: 16 * 1024 * 1024,
            allowed_mime_types: Vec::new(),
            allowed_extensions: Vec::new(),
            allowed_kinds: Vec::new(),
            auto_start: true,
            max_concurrent: 3,
            dispatch: DispatchStrategy::Chunked,
        }
    }
}

impl OrchestratorConfig {
    pub fn concurrency(&self) -> usize {
        self.max_concurrent.max(1)
    }
}

/// Multipart HTTP transport settings (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Upload endpoint, e.g. `https://example.com/api/upload/image`.
    pub endpoint: Option<String>,
    /// Multipart field name carrying the file.
    pub field_name: String,
    /// JSON field of the response holding the stored file's URL.
    pub result_field: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            field_name: "image".to_string(),
            result_field: "url".to_string(),
            connect_timeout_secs: 30,
            timeout_secs: 600,
        }
    }
}

impl HttpConfig {
    /// Parsed endpoint; errors if unset or not an http(s) URL.
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let raw = self
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no upload endpoint configured ([http] endpoint)"))?;
        let parsed = url::Url::parse(raw).with_context(|| format!("invalid endpoint: {raw}"))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => anyhow::bail!("unsupported endpoint scheme: {other}"),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Simulated transport pacing (`[simulation]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Percent advanced per tick.
    pub step_percent: u8,
    /// Milliseconds between ticks.
    pub tick_millis: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_percent: 10,
            tick_millis: 100,
        }
    }
}

/// Global configuration loaded from `~/.config/upo/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpoConfig {
    pub orchestrator: OrchestratorConfig,
    pub http: HttpConfig,
    pub simulation: SimulationConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("upo")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UpoConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UpoConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: UpoConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
