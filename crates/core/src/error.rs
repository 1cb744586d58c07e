//! Error types for the chunkwise pipeline.
//!
//! This module defines a unified error enum covering configuration, capability,
//! timeout, I/O and serialization failures. Degraded text quality is never an
//! error; it is reported through chunk metadata instead.

use thiserror::Error;

/// Unified error type for the chunkwise crates.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Application configuration errors (workspace, config files, logging)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A chunking configuration broke one or more rules. Every violation is listed.
    #[error("Invalid chunk configuration: {}", .0.join("; "))]
    InvalidChunkConfig(Vec<String>),

    /// Chunking was requested while the capability gate is off
    #[error("Chunking disabled: {0}")]
    Disabled(String),

    /// A caller-imposed time limit was exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failures while running the pipeline itself (task join errors, bad input files)
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error should be counted as a timeout by run monitoring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_lists_every_rule() {
        let err = AppError::InvalidChunkConfig(vec![
            "chunk_size must be at least 100".to_string(),
            "overlap must be less than chunk_size".to_string(),
        ]);
        let message = err.to_string();
        assert!(message.contains("chunk_size must be at least 100"));
        assert!(message.contains("overlap must be less than chunk_size"));
    }

    #[test]
    fn test_timeout_classification() {
        assert!(AppError::Timeout("slow".into()).is_timeout());
        assert!(!AppError::Disabled("off".into()).is_timeout());
    }

    #[test]
    fn test_from_anyhow() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Other(ref m) if m == "boom"));
    }
}
