//! Metadata enhancement.
//!
//! A second pass over the finished chunk list. Section context needs the
//! whole list (parents, siblings), so enhancement is batch, not streaming.
//! Pure over its inputs apart from the timing it records.

mod document;
mod quality;
mod section;
mod semantic;
mod stats;
mod types;

pub use document::{build_document_context, detect_document_type, detect_language};
pub use quality::quality_metrics;
pub use section::{detect_section_type, section_number};
pub use semantic::{entities, extract_semantic_context};
pub use stats::{analyze_content, technical_terms};
pub use types::{
    ContentStats, CrossReference, DocumentContext, DocumentType, Entity, EntityKind, Language,
    ProcessingStats, QualityMetrics, ReferenceKind, SectionContext, SectionType, SemanticContext,
    TargetType,
};

use crate::chunk::{Chunk, ChunkTimings};
use crate::progress::ProgressReporter;
use crate::types::{DocumentInfo, PageText};
use section::SectionIndex;
use std::time::Instant;

/// Attaches document, section, content, semantic, processing and quality
/// context to every chunk.
#[derive(Clone, Default)]
pub struct MetadataEnhancer {
    timings: ChunkTimings,
    extraction_ms: u64,
    progress: ProgressReporter,
}

impl MetadataEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine timings reported in each chunk's processing stats.
    pub fn with_timings(mut self, timings: ChunkTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Time the upstream text extractor spent, when the caller knows it.
    pub fn with_extraction_ms(mut self, extraction_ms: u64) -> Self {
        self.extraction_ms = extraction_ms;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn enhance(
        &self,
        mut chunks: Vec<Chunk>,
        pages: &[PageText],
        info: Option<&DocumentInfo>,
    ) -> Vec<Chunk> {
        let started = Instant::now();
        let document = build_document_context(pages, info);
        let total = chunks.len() as u64;

        let sections: Vec<SectionContext> = {
            let index = SectionIndex::new(&chunks);
            (0..chunks.len()).map(|i| index.context(i)).collect()
        };

        for (i, (chunk, section)) in chunks.iter_mut().zip(sections).enumerate() {
            let stats = analyze_content(&chunk.content);
            let semantic = extract_semantic_context(&chunk.content);
            let quality = quality_metrics(&chunk.content, &chunk.metadata, &stats, &semantic);

            let metadata = &mut chunk.metadata;
            metadata.document_context = Some(document.clone());
            metadata.section_context = Some(section);
            metadata.content_stats = Some(stats);
            metadata.semantic_context = Some(semantic);
            metadata.quality_metrics = Some(quality);

            self.progress.enhance(i as u64 + 1, Some(total));
        }

        let enhancement_ms = started.elapsed().as_millis() as u64;
        let processing = ProcessingStats {
            extraction_ms: self.extraction_ms,
            preprocessing_ms: self.timings.preprocessing_ms,
            chunking_ms: self.timings.chunking_ms,
            enhancement_ms,
            total_ms: self.extraction_ms
                + self.timings.preprocessing_ms
                + self.timings.chunking_ms
                + enhancement_ms,
        };
        for chunk in &mut chunks {
            chunk.metadata.processing_stats = Some(processing);
        }

        tracing::debug!(
            chunks = chunks.len(),
            document_type = %document.document_type,
            enhancement_ms,
            "Enhanced chunk metadata"
        );

        chunks
    }
}

/// Enhance with default settings.
pub fn enhance(chunks: Vec<Chunk>, pages: &[PageText], info: Option<&DocumentInfo>) -> Vec<Chunk> {
    MetadataEnhancer::new().enhance(chunks, pages, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::DocumentChunker;
    use crate::progress::ProgressEvent;
    use crate::types::DocumentInput;

    #[test]
    fn test_enhance_fills_every_block() {
        let pages = vec![PageText::new(
            1,
            "Acme Service Manual\n\n# Safety\nWARNING: Disconnect power. Torque to 50 Nm.",
        )];
        let input = DocumentInput::new("doc", "tenant", pages.clone());
        let (chunks, timings) = DocumentChunker::default().chunk_timed(&input);

        let enhanced = MetadataEnhancer::new()
            .with_timings(timings)
            .enhance(chunks, &pages, None);

        assert_eq!(enhanced.len(), 1);
        let meta = &enhanced[0].metadata;
        assert!(meta.is_enhanced());
        let document = meta.document_context.as_ref().unwrap();
        assert_eq!(document.document_type, DocumentType::ServiceManual);
        assert_eq!(document.page_count, 1);
        assert_eq!(
            meta.section_context.as_ref().map(|s| s.section_type),
            Some(SectionType::Safety)
        );
        let stats = meta.processing_stats.unwrap();
        assert!(stats.total_ms >= stats.enhancement_ms);
    }

    #[test]
    fn test_enhance_empty_list() {
        assert!(enhance(Vec::new(), &[], None).is_empty());
    }

    #[test]
    fn test_enhance_reports_progress() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(0u64));
        let sink = seen.clone();
        let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
            *sink.lock().unwrap() = event.current;
        }));

        let pages = vec![PageText::new(1, "Short page of text.")];
        let chunks = DocumentChunker::default().chunk(&DocumentInput::new("d", "t", pages.clone()));
        let count = chunks.len() as u64;
        MetadataEnhancer::new().with_progress(progress).enhance(chunks, &pages, None);
        assert_eq!(*seen.lock().unwrap(), count);
    }
}
