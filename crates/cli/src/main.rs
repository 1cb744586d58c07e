//! chunkwise CLI
//!
//! Main entry point for the chunkwise command-line tool.
//! Chunks extracted document text, manages chunking configuration and
//! reports pipeline health from recorded runs.

mod commands;

use chunkwise_core::logging::{self, LogFormat};
use chunkwise_core::{config::AppConfig, AppResult};
use clap::{Parser, Subcommand};
use commands::{ChunkCommand, ConfigCommand, HealthCommand};
use std::path::PathBuf;

/// chunkwise - document chunking and enrichment for retrieval pipelines
#[derive(Parser, Debug)]
#[command(name = "chunkwise")]
#[command(about = "Document chunking and enrichment for retrieval pipelines", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CHUNKWISE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CHUNKWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Chunk-size preset (small, medium, large, technical, manual)
    #[arg(short, long, global = true, env = "CHUNKWISE_PRESET")]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk documents from page files
    Chunk(ChunkCommand),

    /// Inspect and edit the chunking configuration
    Config(ConfigCommand),

    /// Show pipeline health from recorded runs
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    // Flags can point at a different workspace or config file than the environment did
    let config = if cli.workspace.is_some() || cli.config.is_some() {
        let config = config.with_overrides(cli.workspace, cli.config, None, None, false, false);
        let path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));
        if path.exists() {
            config.merge_yaml(&path)?
        } else {
            config
        }
    } else {
        config
    };

    // Remaining flags win over file and environment
    let config = config.with_overrides(None, None, cli.preset, cli.log_level, cli.verbose, cli.no_color);
    config.validate()?;

    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging_with_format(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("chunkwise starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Chunking enabled: {}", config.chunking_enabled);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Chunk(_) => "chunk",
        Commands::Config(_) => "config",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chunk(cmd) => cmd.execute(&config).await,
        Commands::Config(cmd) => cmd.execute(&config),
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
