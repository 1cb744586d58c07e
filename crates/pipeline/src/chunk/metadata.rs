//! Per-chunk metadata.

use super::tokens::TokenBreakdown;
use crate::analysis::{ContentAnalysis, SpecialContentCounts};
use crate::enhance::{
    ContentStats, DocumentContext, ProcessingStats, QualityMetrics, SectionContext,
    SemanticContext,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::Range;

/// Structural facts recorded when a chunk is emitted, plus the enrichment
/// blocks filled in by the enhancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub document_id: String,
    pub chunk_index: usize,
    pub start_page: u32,
    pub end_page: u32,
    pub section_header: Option<String>,
    /// Heading titles from the document root down to `section_header`
    pub section_path: Vec<String>,
    pub document_title: Option<String>,
    pub author: Option<String>,
    pub page_position: PagePosition,
    pub flags: ContentFlags,
    /// Token estimate scaled by `content_weight`
    pub token_count: usize,
    pub token_breakdown: TokenBreakdown,
    pub special_content: SpecialContentCounts,
    pub content_weight: f64,
    pub kept_together: bool,
    pub preprocessing: PreprocessingInfo,
    /// SHA-256 of `content`
    pub content_hash: String,
    /// Byte range in the joined document text
    pub byte_range: Range<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_context: Option<DocumentContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_context: Option<SectionContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_stats: Option<ContentStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_context: Option<SemanticContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_stats: Option<ProcessingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<QualityMetrics>,
}

impl ChunkMetadata {
    pub fn is_enhanced(&self) -> bool {
        self.quality_metrics.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFlags {
    pub has_table: bool,
    pub has_list: bool,
    pub has_image: bool,
    pub has_code: bool,
    pub has_diagram: bool,
}

impl ContentFlags {
    pub fn from_analysis(analysis: &ContentAnalysis) -> Self {
        Self {
            has_table: analysis.tables().next().is_some(),
            has_list: analysis.lists().next().is_some(),
            has_image: analysis.diagrams().any(|d| d.kind.is_image()),
            has_code: analysis.code_blocks().next().is_some(),
            has_diagram: analysis.diagrams().any(|d| !d.kind.is_image()),
        }
    }
}

/// Where the middle of a chunk sits on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PagePosition {
    Top,
    Middle,
    Bottom,
}

impl PagePosition {
    /// `relative` is the 0..=1 offset within the page.
    pub fn from_relative(relative: f64) -> Self {
        if relative < 0.33 {
            PagePosition::Top
        } else if relative < 0.66 {
            PagePosition::Middle
        } else {
            PagePosition::Bottom
        }
    }
}

/// How the chunk text was derived from the raw pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessingInfo {
    pub original_length: usize,
    pub normalized_length: usize,
    pub transformations: Vec<String>,
    /// Lowest normalization quality score among the covered pages
    pub quality_score: u32,
}

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
