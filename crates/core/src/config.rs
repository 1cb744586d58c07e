//! Application configuration for chunkwise.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.chunkwise/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Chunk sizing parameters are not stored here; they live in the pipeline
//! crate's `ChunkConfig`, which has its own validation rules. This struct only
//! selects which preset or file to start from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Directory under the workspace that holds chunkwise state.
pub const STATE_DIR: &str = ".chunkwise";

/// Preset names accepted by `chunking.preset`.
pub const KNOWN_PRESETS: [&str; 5] = ["small", "medium", "large", "technical", "manual"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .chunkwise/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Capability gate for chunking runs
    pub chunking_enabled: bool,

    /// Named chunk-size preset to start from
    pub preset: Option<String>,

    /// Upper bound for a single document run, in seconds
    pub timeout_secs: Option<u64>,

    /// Health-check polling interval in seconds
    pub monitor_interval_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit JSON log lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    chunking: Option<ChunkingSection>,
    monitor: Option<MonitorSection>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkingSection {
    enabled: Option<bool>,
    preset: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorSection {
    interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            chunking_enabled: true,
            preset: None,
            timeout_secs: None,
            monitor_interval_secs: 30,
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `CHUNKWISE_WORKSPACE`: Override workspace path
    /// - `CHUNKWISE_CONFIG`: Path to config file
    /// - `CHUNKING_ENABLED`: `true`/`false` capability gate
    /// - `CHUNKWISE_PRESET`: Chunk-size preset name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CHUNKWISE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CHUNKWISE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(STATE_DIR).join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(enabled) = std::env::var("CHUNKING_ENABLED") {
            config.chunking_enabled = parse_flag(&enabled).ok_or_else(|| {
                AppError::Config(format!("CHUNKING_ENABLED is not a boolean: {}", enabled))
            })?;
        }

        if let Ok(preset) = std::env::var("CHUNKWISE_PRESET") {
            config.preset = Some(preset);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_json = format.eq_ignore_ascii_case("json");
            }
        }

        if let Some(chunking) = config_file.chunking {
            if let Some(enabled) = chunking.enabled {
                result.chunking_enabled = enabled;
            }
            if chunking.preset.is_some() {
                result.preset = chunking.preset;
            }
            if chunking.timeout_secs.is_some() {
                result.timeout_secs = chunking.timeout_secs;
            }
        }

        if let Some(interval) = config_file.monitor.and_then(|m| m.interval_secs) {
            result.monitor_interval_secs = interval;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over both the config file and the environment.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        preset: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(preset) = preset {
            self.preset = Some(preset);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .chunkwise directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .chunkwise directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Path of the run-metrics log written by chunking runs.
    pub fn metrics_path(&self) -> PathBuf {
        self.state_dir().join("metrics.jsonl")
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(ref preset) = self.preset {
            if !KNOWN_PRESETS.contains(&preset.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown preset: {}. Supported: {}",
                    preset,
                    KNOWN_PRESETS.join(", ")
                )));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(AppError::Config(
                "chunking.timeoutSecs must be greater than zero".to_string(),
            ));
        }

        if self.monitor_interval_secs == 0 {
            return Err(AppError::Config(
                "monitor.intervalSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse the boolean spellings accepted in environment variables.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
