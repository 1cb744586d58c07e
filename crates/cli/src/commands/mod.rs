//! Command handlers for the chunkwise CLI.

pub mod chunk;
pub mod config;
pub mod health;

pub use chunk::ChunkCommand;
pub use config::ConfigCommand;
pub use health::HealthCommand;
