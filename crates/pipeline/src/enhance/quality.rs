//! Heuristic chunk quality scores.

use super::types::{ContentStats, QualityMetrics, SemanticContext};
use crate::chunk::ChunkMetadata;

pub fn quality_metrics(
    content: &str,
    metadata: &ChunkMetadata,
    stats: &ContentStats,
    semantic: &SemanticContext,
) -> QualityMetrics {
    let completeness = completeness(content, stats);
    let coherence = coherence(content, stats);
    let relevance = relevance(semantic);
    let structural_integrity = structural_integrity(metadata);
    let embedding_readiness = embedding_readiness(metadata, stats);

    QualityMetrics {
        completeness,
        coherence,
        relevance,
        structural_integrity,
        embedding_readiness,
        overall: (completeness + coherence + relevance + structural_integrity + embedding_readiness)
            / 5.0,
    }
}

fn completeness(content: &str, stats: &ContentStats) -> f64 {
    let mut score = 0.0;
    if content.trim_end().ends_with(['.', '!', '?']) {
        score += 0.4;
    }
    if stats.word_count >= 20 {
        score += 0.3;
    }
    if stats.sentence_count >= 1 {
        score += 0.3;
    }
    score
}

fn coherence(content: &str, stats: &ContentStats) -> f64 {
    let words_per_sentence = if stats.sentence_count > 0 {
        stats.word_count as f64 / stats.sentence_count as f64
    } else {
        0.0
    };

    let mut score = 0.0;
    if (5.0..=30.0).contains(&words_per_sentence) {
        score += 0.5;
    }
    if !content.contains("...") && !content.contains('\u{2026}') {
        score += 0.5;
    }
    score
}

fn relevance(semantic: &SemanticContext) -> f64 {
    let mut score: f64 = 0.0;
    if !semantic.entities.is_empty() {
        score += 0.3;
    }
    if !semantic.key_phrases.is_empty() {
        score += 0.3;
    }
    if !semantic.procedures.is_empty() {
        score += 0.2;
    }
    if !semantic.cross_references.is_empty() {
        score += 0.2;
    }
    score.min(1.0)
}

fn structural_integrity(metadata: &ChunkMetadata) -> f64 {
    let counts = &metadata.special_content;
    let mut score = 0.5;
    if counts.tables + counts.lists + counts.code_blocks > 0 {
        score += 0.3;
    }
    if metadata.preprocessing.quality_score > 0 {
        score += 0.2;
    }
    score
}

fn embedding_readiness(metadata: &ChunkMetadata, stats: &ContentStats) -> f64 {
    let mut score = 0.0;
    if (50..=500).contains(&stats.word_count) {
        score += 0.4;
    }
    let quality = match metadata.preprocessing.quality_score {
        0 => 0.5,
        q => f64::from(q.min(100)) / 100.0,
    };
    score += quality * 0.4;
    if stats.technical_density < 0.3 {
        score += 0.2;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::{semantic, stats};
    use crate::tests::fixtures::chunk_at_level;

    fn score(content: &str) -> QualityMetrics {
        let mut chunk = chunk_at_level("doc", 0, 0);
        chunk.content = content.to_string();
        chunk.metadata.preprocessing.quality_score = 100;
        let stats = stats::analyze_content(content);
        let semantic = semantic::extract_semantic_context(content);
        quality_metrics(content, &chunk.metadata, &stats, &semantic)
    }

    #[test]
    fn test_complete_prose() {
        let text = "Remove the four screws that hold the front cover of the pump housing in place. \
                    Lift the cover away and set it aside on a clean and dry surface before you continue.";
        let metrics = score(text);
        assert!((metrics.completeness - 1.0).abs() < 1e-9);
        assert!((metrics.coherence - 1.0).abs() < 1e-9);
        assert!(metrics.relevance >= 0.2);
        assert!((metrics.structural_integrity - 0.7).abs() < 1e-9);
        assert!(metrics.overall > 0.0 && metrics.overall <= 1.0);
    }

    #[test]
    fn test_truncated_fragment() {
        let metrics = score("and then the...");
        assert!((metrics.completeness - 0.7).abs() < 1e-9);
        assert_eq!(metrics.coherence, 0.0);
    }
}
