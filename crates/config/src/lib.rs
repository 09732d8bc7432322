use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level warden configuration, stored as JSON at
/// `<assistant_dir>/warden/config.json`. Every section and field has a
/// default so an absent or partial file is always legal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Override for the host assistant's home directory (default `~/.claude`).
    #[serde(default)]
    pub assistant_dir: Option<String>,
    #[serde(default)]
    pub guards: GuardSettings,
    #[serde(default)]
    pub duplicate: DuplicateSettings,
    #[serde(default)]
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub review: ReviewSettings,
    #[serde(default, rename = "override")]
    pub override_auth: OverrideSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardSettings {
    /// Guard names to skip entirely. The registry refuses to disable guards
    /// marked fail-closed.
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_similarity_threshold() -> f32 {
    0.75
}

fn default_top_k() -> usize {
    5
}

fn default_min_lines() -> usize {
    5
}

fn default_embedding_dimension() -> usize {
    384
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cosine similarity above which a write is treated as a near-duplicate.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Content shorter than this many lines is never checked.
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
    #[serde(default)]
    pub embedding_url: Option<String>,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default)]
    pub qdrant_url: Option<String>,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            min_lines: default_min_lines(),
            embedding_url: None,
            embedding_dimension: default_embedding_dimension(),
            qdrant_url: None,
        }
    }
}

impl DuplicateSettings {
    /// Embedding service endpoint: env var wins, then config, then localhost.
    pub fn embedding_url(&self) -> String {
        std::env::var("WARDEN_EMBEDDING_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.embedding_url.clone())
            .unwrap_or_else(|| "http://localhost:8982".to_string())
    }

    /// Vector store endpoint: env var wins, then config, then localhost.
    pub fn qdrant_url(&self) -> String {
        std::env::var("WARDEN_QDRANT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.qdrant_url.clone())
            .unwrap_or_else(|| "http://localhost:6333".to_string())
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_rescan_interval_secs() -> u64 {
    60
}

fn default_health_port() -> u16 {
    9876
}

fn default_max_file_size() -> u64 {
    512 * 1024
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSettings {
    /// Extra directory or glob-ish patterns to skip, on top of the built-in
    /// skip set and the repository's .gitignore.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_rescan_interval_secs")]
    pub rescan_interval_secs: u64,
    #[serde(default = "default_health_port")]
    pub health_port: u16,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            debounce_ms: default_debounce_ms(),
            rescan_interval_secs: default_rescan_interval_secs(),
            health_port: default_health_port(),
            max_file_size: default_max_file_size(),
            workers: default_workers(),
        }
    }
}

fn default_review_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_review_max_file_bytes() -> u64 {
    256 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    #[serde(default = "default_review_model")]
    pub model: String,
    /// Files larger than this are skipped and reported, not truncated.
    #[serde(default = "default_review_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Per-million-token pricing override; absent means the built-in table.
    #[serde(default)]
    pub pricing: Option<PricingOverride>,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            model: default_review_model(),
            max_file_bytes: default_review_max_file_bytes(),
            pricing: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverride {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

fn default_skew_steps() -> u64 {
    1
}

fn default_step_secs() -> u64 {
    30
}

fn default_digits() -> u32 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideSettings {
    /// Path to the base32 shared secret. Provisioning is out-of-band;
    /// warden only ever reads this file.
    #[serde(default)]
    pub secret_path: Option<String>,
    #[serde(default = "default_skew_steps")]
    pub skew_steps: u64,
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,
    #[serde(default = "default_digits")]
    pub digits: u32,
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            secret_path: None,
            skew_steps: default_skew_steps(),
            step_secs: default_step_secs(),
            digits: default_digits(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration from its well-known path, or from
    /// `WARDEN_CONFIG` when set. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Like `load`, but a broken config file degrades to defaults with a
    /// warning. The hook must never refuse an action because its own config
    /// is malformed.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default config");
                Self::default()
            }
        }
    }

    pub fn assistant_dir(&self) -> PathBuf {
        if let Some(dir) = &self.assistant_dir {
            return expand_home(dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude")
    }

    /// Warden's own state directory inside the assistant directory.
    pub fn warden_dir(&self) -> PathBuf {
        self.assistant_dir().join("warden")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.warden_dir().join("logs")
    }

    pub fn override_secret_path(&self) -> PathBuf {
        if let Some(p) = &self.override_auth.secret_path {
            return expand_home(p);
        }
        self.warden_dir().join("override_secret")
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("WARDEN_CONFIG") {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("warden")
        .join("config.json")
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert!(cfg.duplicate.enabled);
        assert!((cfg.duplicate.similarity_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(cfg.duplicate.top_k, 5);
        assert_eq!(cfg.duplicate.min_lines, 5);
        assert_eq!(cfg.indexer.debounce_ms, 1000);
        assert_eq!(cfg.indexer.rescan_interval_secs, 60);
        assert_eq!(cfg.override_auth.digits, 6);
        assert_eq!(cfg.override_auth.step_secs, 30);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"duplicate": {"similarity_threshold": 0.9}}"#).unwrap();
        assert!((cfg.duplicate.similarity_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(cfg.duplicate.top_k, 5);
        assert!(cfg.guards.disabled.is_empty());
    }

    #[test]
    fn override_section_uses_reserved_word_key() {
        let cfg: Config = serde_json::from_str(r#"{"override": {"skew_steps": 2}}"#).unwrap();
        assert_eq!(cfg.override_auth.skew_steps, 2);
        assert_eq!(cfg.override_auth.digits, 6);
    }

    #[test]
    fn assistant_dir_override() {
        let cfg: Config = serde_json::from_str(r#"{"assistant_dir": "/opt/host"}"#).unwrap();
        assert_eq!(cfg.assistant_dir(), PathBuf::from("/opt/host"));
        assert_eq!(cfg.warden_dir(), PathBuf::from("/opt/host/warden"));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let cfg: Config =
            serde_json::from_str(r#"{"future_section": {"x": 1}, "guards": {"disabled": ["sql_in_shell"]}}"#)
                .unwrap();
        assert_eq!(cfg.guards.disabled, vec!["sql_in_shell".to_string()]);
    }
}
