//! Chunk model and the boundary engine that produces it.

mod boundary;
mod engine;
mod metadata;
mod tokens;

pub use engine::{ChunkTimings, DocumentChunker};
pub use metadata::{calculate_hash, ChunkMetadata, ContentFlags, PagePosition, PreprocessingInfo};
pub use tokens::{HeuristicEstimator, TokenBreakdown, TokenEstimator};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A size-bounded segment of a document, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// `{document_id}_chunk_{index}`
    pub id: String,

    /// Cleaned chunk text
    pub content: String,

    pub metadata: ChunkMetadata,

    pub relationships: Relationships,

    pub tenant_id: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn make_id(document_id: &str, index: usize) -> String {
        format!("{}_chunk_{}", document_id, index)
    }

    pub fn index(&self) -> usize {
        self.metadata.chunk_index
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Links between chunks of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_chunk_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chunk_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,

    #[serde(default)]
    pub child_chunk_ids: Vec<String>,

    /// 0 for top-level sections, one more per heading level
    #[serde(default)]
    pub hierarchy_level: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(Chunk::make_id("manual-7", 3), "manual-7_chunk_3");
    }

    #[test]
    fn test_relationships_json_shape() {
        let rel = Relationships {
            previous_chunk_id: Some("d_chunk_0".to_string()),
            hierarchy_level: 2,
            ..Relationships::default()
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["previousChunkId"], "d_chunk_0");
        assert_eq!(json["hierarchyLevel"], 2);
        assert!(json.get("nextChunkId").is_none());
        assert_eq!(json["childChunkIds"], serde_json::json!([]));
    }
}
