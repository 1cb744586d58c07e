//! Document chunking and enrichment.
//!
//! Pages of extracted text go in; size-bounded, linked chunks carrying
//! document, section, content, semantic and quality metadata come out.
//! [`ChunkingService`] wraps the pipeline with a capability gate, timeouts
//! and run recording for the [`HealthMonitor`].

pub mod analysis;
pub mod chunk;
pub mod config;
pub mod enhance;
pub mod monitor;
pub mod normalize;
pub mod outline;
pub mod progress;
pub mod relationships;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkMetadata, DocumentChunker, Relationships, TokenEstimator};
pub use config::{ChunkConfig, ChunkConfigManager, ChunkConfigUpdate, Preset};
pub use enhance::MetadataEnhancer;
pub use monitor::{HealthMonitor, HealthState, HealthStatus, HealthThresholds, RunRecord};
pub use outline::DocumentOutline;
pub use progress::{ProgressEvent, ProgressReporter};
pub use service::{
    CapabilityGate, ChunkingResult, ChunkingService, ChunkingStatistics, FeatureFlag,
    CHUNKING_FLAG,
};
pub use types::{DocumentInfo, DocumentInput, PageText};
