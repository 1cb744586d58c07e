//! Chunking configuration: validation, presets and persistence.
//!
//! `ChunkConfig` values are checked against a fixed rule set on every
//! construction path (programmatic update, preset, environment, YAML, JSON).
//! A rejected update never leaves the manager half-applied.

use chunkwise_core::config::STATE_DIR;
use chunkwise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MIN_CHUNK_SIZE_LIMIT: usize = 100;
pub const MAX_CHUNK_SIZE_LIMIT: usize = 10_000;
pub const MAX_OVERLAP: usize = 2_000;
pub const MIN_MIN_CHUNK_SIZE: usize = 10;

/// Parameters for one chunking run.
///
/// `chunk_size` and `overlap` are measured in characters of normalized text;
/// `min_chunk_size` is compared against the estimated token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub respect_sentences: bool,
    pub respect_paragraphs: bool,
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Preset::Medium.config()
    }
}

impl ChunkConfig {
    /// Every rule this configuration breaks, in a stable order.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.chunk_size < MIN_CHUNK_SIZE_LIMIT {
            errors.push(format!("chunkSize must be at least {}", MIN_CHUNK_SIZE_LIMIT));
        }
        if self.chunk_size > MAX_CHUNK_SIZE_LIMIT {
            errors.push(format!("chunkSize must not exceed {}", MAX_CHUNK_SIZE_LIMIT));
        }
        if self.overlap >= self.chunk_size {
            errors.push("overlap must be less than chunkSize".to_string());
        }
        if self.overlap > MAX_OVERLAP {
            errors.push(format!("overlap must not exceed {}", MAX_OVERLAP));
        }
        if self.min_chunk_size < MIN_MIN_CHUNK_SIZE {
            errors.push(format!("minChunkSize must be at least {}", MIN_MIN_CHUNK_SIZE));
        }
        if self.min_chunk_size >= self.chunk_size {
            errors.push("minChunkSize must be less than chunkSize".to_string());
        }

        errors
    }

    /// Validate, reporting all violated rules together.
    pub fn validate(&self) -> AppResult<()> {
        let errors = self.violations();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidChunkConfig(errors))
        }
    }

    /// Apply a partial update, returning the candidate without validating it.
    pub fn merged(&self, update: &ChunkConfigUpdate) -> Self {
        Self {
            chunk_size: update.chunk_size.unwrap_or(self.chunk_size),
            overlap: update.overlap.unwrap_or(self.overlap),
            respect_sentences: update.respect_sentences.unwrap_or(self.respect_sentences),
            respect_paragraphs: update.respect_paragraphs.unwrap_or(self.respect_paragraphs),
            min_chunk_size: update.min_chunk_size.unwrap_or(self.min_chunk_size),
        }
    }

    /// Read overrides from `CHUNK_SIZE`, `CHUNK_OVERLAP`, `RESPECT_SENTENCES`,
    /// `RESPECT_PARAGRAPHS` and `MIN_CHUNK_SIZE` on top of `base`.
    pub fn from_env(base: ChunkConfig) -> AppResult<Self> {
        Self::from_lookup(base, |key| std::env::var(key).ok())
    }

    /// Same as [`ChunkConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(base: ChunkConfig, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| -> AppResult<Option<usize>> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<usize>().map_err(|_| {
                        AppError::Config(format!("{} must be a non-negative integer, got {:?}", key, raw))
                    })
                })
                .transpose()
        };
        let flag = |key: &str| -> AppResult<Option<bool>> {
            lookup(key)
                .map(|raw| {
                    chunkwise_core::config::parse_flag(&raw).ok_or_else(|| {
                        AppError::Config(format!("{} must be a boolean, got {:?}", key, raw))
                    })
                })
                .transpose()
        };

        let update = ChunkConfigUpdate {
            chunk_size: number("CHUNK_SIZE")?,
            overlap: number("CHUNK_OVERLAP")?,
            respect_sentences: flag("RESPECT_SENTENCES")?,
            respect_paragraphs: flag("RESPECT_PARAGRAPHS")?,
            min_chunk_size: number("MIN_CHUNK_SIZE")?,
        };

        let config = base.merged(&update);
        config.validate()?;
        Ok(config)
    }

    /// Tuned parameters for a kind of document.
    pub fn optimized_for(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Manual => Preset::Manual.config(),
            DocumentKind::Technical => Preset::Technical.config(),
            DocumentKind::Guide => ChunkConfig {
                chunk_size: 1200,
                overlap: 200,
                respect_sentences: true,
                respect_paragraphs: true,
                min_chunk_size: 120,
            },
            DocumentKind::Specification => ChunkConfig {
                chunk_size: 2000,
                overlap: 400,
                respect_sentences: false,
                respect_paragraphs: false,
                min_chunk_size: 200,
            },
        }
    }

    /// Rough cost of chunking `text_len` characters with this configuration.
    pub fn estimate_processing(&self, text_len: usize) -> ProcessingEstimate {
        let stride = self.chunk_size.saturating_sub(self.overlap).max(1);
        let estimated_chunks = text_len.div_ceil(stride);
        let estimated_ms = (estimated_chunks as u64) * 10 + (text_len as u64 / 1000) * 5;
        ProcessingEstimate {
            estimated_chunks,
            estimated_ms,
        }
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse YAML and apply the same validation as a programmatic update.
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        let config: ChunkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON and apply the same validation as a programmatic update.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: ChunkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkConfigUpdate {
    pub chunk_size: Option<usize>,
    pub overlap: Option<usize>,
    pub respect_sentences: Option<bool>,
    pub respect_paragraphs: Option<bool>,
    pub min_chunk_size: Option<usize>,
}

/// Output of [`ChunkConfig::estimate_processing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEstimate {
    pub estimated_chunks: usize,
    pub estimated_ms: u64,
}

/// Named, pre-vetted parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Small,
    Medium,
    Large,
    Technical,
    Manual,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Small,
        Preset::Medium,
        Preset::Large,
        Preset::Technical,
        Preset::Manual,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Small => "small",
            Preset::Medium => "medium",
            Preset::Large => "large",
            Preset::Technical => "technical",
            Preset::Manual => "manual",
        }
    }

    pub fn config(&self) -> ChunkConfig {
        let (chunk_size, overlap, respect_sentences, respect_paragraphs, min_chunk_size) =
            match self {
                Preset::Small => (500, 50, true, true, 50),
                Preset::Medium => (1000, 200, true, true, 100),
                Preset::Large => (2000, 400, true, false, 200),
                Preset::Technical => (1500, 300, false, true, 150),
                Preset::Manual => (800, 100, true, true, 80),
            };
        ChunkConfig {
            chunk_size,
            overlap,
            respect_sentences,
            respect_paragraphs,
            min_chunk_size,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                AppError::Config(format!(
                    "Unknown preset: {}. Supported: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Document families with their own tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Manual,
    Technical,
    Guide,
    Specification,
}

impl FromStr for DocumentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(DocumentKind::Manual),
            "technical" => Ok(DocumentKind::Technical),
            "guide" => Ok(DocumentKind::Guide),
            "specification" | "spec" => Ok(DocumentKind::Specification),
            other => Err(AppError::Config(format!("Unknown document kind: {}", other))),
        }
    }
}

/// Caller-owned holder of the active configuration.
#[derive(Debug, Clone)]
pub struct ChunkConfigManager {
    current: ChunkConfig,
}

impl Default for ChunkConfigManager {
    fn default() -> Self {
        Self {
            current: ChunkConfig::default(),
        }
    }
}

impl ChunkConfigManager {
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { current: config })
    }

    pub fn get(&self) -> &ChunkConfig {
        &self.current
    }

    /// Merge `update` into the current config. On any violation nothing changes.
    pub fn update(&mut self, update: &ChunkConfigUpdate) -> AppResult<&ChunkConfig> {
        let candidate = self.current.merged(update);
        candidate.validate()?;
        tracing::debug!(?candidate, "Chunk configuration updated");
        self.current = candidate;
        Ok(&self.current)
    }

    /// Check a candidate without applying it.
    pub fn validate(&self, candidate: &ChunkConfig) -> Vec<String> {
        candidate.violations()
    }

    pub fn reset(&mut self) {
        self.current = ChunkConfig::default();
    }

    pub fn apply_preset(&mut self, preset: Preset) -> &ChunkConfig {
        self.current = preset.config();
        &self.current
    }

    pub fn presets() -> Vec<(Preset, ChunkConfig)> {
        Preset::ALL.iter().map(|p| (*p, p.config())).collect()
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        self.current.to_yaml()
    }

    /// Replace the current config from YAML; invalid documents leave it untouched.
    pub fn load_yaml(&mut self, yaml: &str) -> AppResult<&ChunkConfig> {
        self.current = ChunkConfig::from_yaml(yaml)?;
        Ok(&self.current)
    }

    pub fn to_json(&self) -> AppResult<String> {
        self.current.to_json()
    }

    /// Replace the current config from JSON; invalid documents leave it untouched.
    pub fn load_json(&mut self, json: &str) -> AppResult<&ChunkConfig> {
        self.current = ChunkConfig::from_json(json)?;
        Ok(&self.current)
    }
}

/// Load the workspace chunk configuration.
///
/// Reads `.chunkwise/chunking.yaml` if it exists, otherwise returns `fallback`.
pub fn load_chunk_config(workspace: &Path, fallback: ChunkConfig) -> AppResult<ChunkConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("No chunk configuration at {:?}, using fallback", config_path);
        return Ok(fallback);
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config = ChunkConfig::from_yaml(&content)?;
    tracing::debug!("Loaded chunk configuration from {:?}", config_path);
    Ok(config)
}

/// Save the workspace chunk configuration.
pub fn save_chunk_config(workspace: &Path, config: &ChunkConfig) -> AppResult<PathBuf> {
    config.validate()?;
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    fs::write(&config_path, config.to_yaml()?).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved chunk configuration to {:?}", config_path);
    Ok(config_path)
}

/// Path of the workspace chunk configuration file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("chunking.yaml")
}
