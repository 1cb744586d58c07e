//! Config command handler.
//!
//! Reads and writes the workspace chunk configuration (`.chunkwise/chunking.yaml`).

use chunkwise_core::{config::AppConfig, AppError, AppResult};
use chunkwise_pipeline::config::{
    get_config_path, load_chunk_config, save_chunk_config, ChunkConfig, ChunkConfigManager,
    ChunkConfigUpdate, DocumentKind, Preset,
};
use clap::{Args, Subcommand};
use std::str::FromStr;

/// Inspect and edit the chunking configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show(ConfigShowCommand),
    /// Check the saved configuration against every rule
    Validate,
    /// List the built-in presets
    Presets(ConfigPresetsCommand),
    /// Write a configuration file from a preset or document kind
    Init(ConfigInitCommand),
    /// Change individual values in the saved configuration
    Set(ConfigSetCommand),
    /// Restore the default configuration
    Reset,
    /// Estimate chunk count and processing time for a text length
    Estimate(ConfigEstimateCommand),
}

/// Chunk configuration for a run: preset if one is selected, else the saved
/// file, else defaults; environment overrides on top.
pub fn resolve_chunk_config(config: &AppConfig) -> AppResult<ChunkConfig> {
    let base = match &config.preset {
        Some(name) => Preset::from_str(name)?.config(),
        None => load_chunk_config(&config.workspace, ChunkConfig::default())?,
    };
    ChunkConfig::from_env(base)
}

fn print_config(config: &ChunkConfig) {
    println!("  chunkSize: {}", config.chunk_size);
    println!("  overlap: {}", config.overlap);
    println!("  respectSentences: {}", config.respect_sentences);
    println!("  respectParagraphs: {}", config.respect_paragraphs);
    println!("  minChunkSize: {}", config.min_chunk_size);
}

/// Show the effective configuration
#[derive(Args, Debug)]
pub struct ConfigShowCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConfigShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let chunk_config = resolve_chunk_config(config)?;

        if self.json {
            let output = serde_json::json!({
                "workspace": config.workspace,
                "chunkingEnabled": config.chunking_enabled,
                "preset": config.preset,
                "timeoutSecs": config.timeout_secs,
                "monitorIntervalSecs": config.monitor_interval_secs,
                "chunking": chunk_config,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Workspace: {}", config.workspace.display());
            println!("Chunking enabled: {}", config.chunking_enabled);
            if let Some(preset) = &config.preset {
                println!("Preset: {}", preset);
            }
            println!("Config file: {}", get_config_path(&config.workspace).display());
            println!("Chunking:");
            print_config(&chunk_config);
        }
        Ok(())
    }
}

/// List the built-in presets
#[derive(Args, Debug)]
pub struct ConfigPresetsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConfigPresetsCommand {
    pub fn execute(&self) -> AppResult<()> {
        let presets = ChunkConfigManager::presets();
        if self.json {
            let output: serde_json::Map<String, serde_json::Value> = presets
                .iter()
                .map(|(preset, config)| -> AppResult<(String, serde_json::Value)> {
                    Ok((preset.name().to_string(), serde_json::to_value(config)?))
                })
                .collect::<AppResult<_>>()?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for (preset, config) in presets {
                println!("{}:", preset);
                print_config(&config);
            }
        }
        Ok(())
    }
}

/// Write a configuration file
#[derive(Args, Debug)]
pub struct ConfigInitCommand {
    /// Start from this preset (default: medium)
    #[arg(long, conflicts_with = "kind")]
    pub preset: Option<String>,

    /// Tune for a document kind (manual, technical, guide, specification)
    #[arg(long)]
    pub kind: Option<String>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl ConfigInitCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let path = get_config_path(&config.workspace);
        if path.exists() && !self.force {
            return Err(AppError::Config(format!(
                "{} already exists. Use --force to overwrite.",
                path.display()
            )));
        }

        let chunk_config = match (&self.preset, &self.kind) {
            (Some(name), _) => Preset::from_str(name)?.config(),
            (None, Some(kind)) => ChunkConfig::optimized_for(DocumentKind::from_str(kind)?),
            (None, None) => ChunkConfig::default(),
        };

        let saved = save_chunk_config(&config.workspace, &chunk_config)?;
        println!("Wrote {}", saved.display());
        Ok(())
    }
}

/// Change individual values
#[derive(Args, Debug)]
pub struct ConfigSetCommand {
    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub overlap: Option<usize>,

    #[arg(long)]
    pub respect_sentences: Option<bool>,

    #[arg(long)]
    pub respect_paragraphs: Option<bool>,

    #[arg(long)]
    pub min_chunk_size: Option<usize>,
}

impl ConfigSetCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let current = load_chunk_config(&config.workspace, ChunkConfig::default())?;
        let mut manager = ChunkConfigManager::new(current)?;

        let update = ChunkConfigUpdate {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            respect_sentences: self.respect_sentences,
            respect_paragraphs: self.respect_paragraphs,
            min_chunk_size: self.min_chunk_size,
        };
        let updated = *manager.update(&update)?;

        let saved = save_chunk_config(&config.workspace, &updated)?;
        println!("Updated {}", saved.display());
        print_config(&updated);
        Ok(())
    }
}

/// Estimate processing for a text length
#[derive(Args, Debug)]
pub struct ConfigEstimateCommand {
    /// Text length in characters
    pub chars: usize,
}

impl ConfigEstimateCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let estimate = resolve_chunk_config(config)?.estimate_processing(self.chars);
        println!("Estimated chunks: {}", estimate.estimated_chunks);
        println!("Estimated time: {}ms", estimate.estimated_ms);
        Ok(())
    }
}

impl ConfigCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            ConfigAction::Show(cmd) => cmd.execute(config),
            ConfigAction::Validate => validate(config),
            ConfigAction::Presets(cmd) => cmd.execute(),
            ConfigAction::Init(cmd) => cmd.execute(config),
            ConfigAction::Set(cmd) => cmd.execute(config),
            ConfigAction::Reset => reset(config),
            ConfigAction::Estimate(cmd) => cmd.execute(config),
        }
    }
}

fn validate(config: &AppConfig) -> AppResult<()> {
    let path = get_config_path(&config.workspace);
    if !path.exists() {
        println!("No configuration file at {}; defaults apply", path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&path)?;
    let candidate: ChunkConfig = serde_yaml::from_str(&content)?;
    let violations = candidate.violations();
    if violations.is_empty() {
        println!("{} is valid", path.display());
        return Ok(());
    }

    for violation in &violations {
        println!("  - {}", violation);
    }
    Err(AppError::InvalidChunkConfig(violations))
}

fn reset(config: &AppConfig) -> AppResult<()> {
    let mut manager = ChunkConfigManager::new(ChunkConfig::default())?;
    manager.reset();
    let saved = save_chunk_config(&config.workspace, manager.get())?;
    println!("Reset {}", saved.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_config(dir: &TempDir) -> AppConfig {
        AppConfig {
            workspace: dir.path().to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_preset_wins_over_saved_file() {
        let dir = TempDir::new().unwrap();
        let mut config = workspace_config(&dir);
        save_chunk_config(&config.workspace, &Preset::Large.config()).unwrap();

        assert_eq!(resolve_chunk_config(&config).unwrap().chunk_size, 2000);

        config.preset = Some("small".to_string());
        assert_eq!(resolve_chunk_config(&config).unwrap(), Preset::Small.config());
    }

    #[test]
    fn test_set_rejects_invalid_update() {
        let dir = TempDir::new().unwrap();
        let config = workspace_config(&dir);
        let cmd = ConfigSetCommand {
            chunk_size: Some(100),
            overlap: Some(150),
            respect_sentences: None,
            respect_paragraphs: None,
            min_chunk_size: None,
        };
        assert!(matches!(cmd.execute(&config), Err(AppError::InvalidChunkConfig(_))));
        assert!(!get_config_path(&config.workspace).exists());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let config = workspace_config(&dir);
        let cmd = ConfigInitCommand {
            preset: None,
            kind: Some("manual".to_string()),
            force: false,
        };
        cmd.execute(&config).unwrap();
        assert!(cmd.execute(&config).is_err());

        let saved = load_chunk_config(&config.workspace, ChunkConfig::default()).unwrap();
        assert_eq!(saved, ChunkConfig::optimized_for(DocumentKind::Manual));
    }
}
