//! The chunk boundary engine.
//!
//! Pages are normalized one by one and joined with a blank line. A cursor then
//! walks the joined text: each step picks a boundary, widens it around
//! structured content, and records the span. Undersized spans fold into the
//! previous one. Chunks are assembled from the final spans, then linked.

use super::boundary::{extend_boundary, find_boundary, next_cursor};
use super::metadata::{calculate_hash, ChunkMetadata, ContentFlags, PagePosition, PreprocessingInfo};
use super::tokens::{HeuristicEstimator, TokenEstimator};
use super::{Chunk, Relationships};
use crate::analysis::{self, SpecialContent};
use crate::config::ChunkConfig;
use crate::normalize::{self, NormalizeOptions, NormalizedText};
use crate::progress::ProgressReporter;
use crate::relationships;
use crate::types::{DocumentInput, PageText};
use chrono::Utc;
use regex::Regex;
use std::ops::Range;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t#]*$").expect("valid heading regex")
});

const PAGE_SEPARATOR: &str = "\n\n";

/// Wall-clock time spent in each engine phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkTimings {
    pub preprocessing_ms: u64,
    pub chunking_ms: u64,
}

/// One page inside the joined text.
#[derive(Debug, Clone)]
pub(crate) struct PageSpan {
    pub page_number: u32,
    pub range: Range<usize>,
    pub transformations: Vec<String>,
    pub quality_score: u32,
}

/// Normalized pages joined into one logical text.
#[derive(Debug, Clone, Default)]
pub(crate) struct JoinedText {
    pub text: String,
    pub pages: Vec<PageSpan>,
}

impl JoinedText {
    pub fn build(pages: &[PageText], progress: &ProgressReporter) -> Self {
        let options = NormalizeOptions::default();
        let mut joined = JoinedText::default();
        let total = pages.len() as u64;

        for (idx, page) in pages.iter().enumerate() {
            progress.normalize(idx as u64 + 1, Some(total), page.page_number);

            let normalized = normalize::normalize(&page.text, &options);
            if normalized.content.is_empty() {
                tracing::debug!(page = page.page_number, "Skipping empty page");
                continue;
            }
            let report = normalize::validate_text_quality(&page.text, &normalized.content);
            if !report.is_valid {
                tracing::warn!(
                    page = page.page_number,
                    score = report.quality_score,
                    issues = ?report.issues,
                    "Low normalization quality"
                );
            }

            if !joined.text.is_empty() {
                joined.text.push_str(PAGE_SEPARATOR);
            }
            let start = joined.text.len();
            joined.text.push_str(&normalized.content);
            joined.pages.push(PageSpan {
                page_number: page.page_number,
                range: start..joined.text.len(),
                transformations: normalized.transformations,
                quality_score: report.quality_score,
            });
        }

        joined
    }

    /// The page holding `pos`; separator bytes belong to the page before.
    pub fn page_at(&self, pos: usize) -> Option<&PageSpan> {
        self.pages
            .iter()
            .rev()
            .find(|p| p.range.start <= pos)
            .or_else(|| self.pages.first())
    }

    pub fn pages_in(&self, range: &Range<usize>) -> impl Iterator<Item = &PageSpan> {
        let range = range.clone();
        self.pages
            .iter()
            .filter(move |p| p.range.start < range.end && range.start < p.range.end + PAGE_SEPARATOR.len())
    }
}

#[derive(Debug, Clone)]
struct Heading {
    offset: usize,
    level: u32,
    title: String,
}

fn find_headings(text: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Heading {
                offset: whole.start(),
                level: caps[1].len() as u32 - 1,
                title: caps[2].trim().to_string(),
            })
        })
        .collect()
}

/// Heading context for a span: the nearest heading at or before its start,
/// else its own first heading.
fn section_context(headings: &[Heading], range: &Range<usize>) -> (Option<String>, Vec<String>, u32) {
    let chosen = headings
        .iter()
        .rposition(|h| h.offset <= range.start)
        .or_else(|| headings.iter().position(|h| h.offset < range.end));

    let Some(idx) = chosen else {
        return (None, Vec::new(), 0);
    };

    let mut stack: Vec<&Heading> = Vec::new();
    for heading in &headings[..=idx] {
        while stack.last().is_some_and(|top| top.level >= heading.level) {
            stack.pop();
        }
        stack.push(heading);
    }

    let current = &headings[idx];
    (
        Some(current.title.clone()),
        stack.iter().map(|h| h.title.clone()).collect(),
        current.level,
    )
}

#[derive(Debug, Clone)]
struct Span {
    range: Range<usize>,
    kept_together: bool,
    /// Embedding-clean text of `range`
    cleaned: NormalizedText,
}

/// Splits documents into chunks with a fixed configuration.
///
/// The configuration is taken as given; validation belongs to
/// [`ChunkConfigManager`](crate::config::ChunkConfigManager) and the service.
#[derive(Clone)]
pub struct DocumentChunker {
    config: ChunkConfig,
    estimator: Arc<dyn TokenEstimator>,
    progress: ProgressReporter,
}

impl DocumentChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            estimator: Arc::new(HeuristicEstimator),
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunk a document. Empty or whitespace-only input yields no chunks.
    pub fn chunk(&self, input: &DocumentInput) -> Vec<Chunk> {
        self.chunk_timed(input).0
    }

    pub fn chunk_timed(&self, input: &DocumentInput) -> (Vec<Chunk>, ChunkTimings) {
        let started = Instant::now();
        let joined = JoinedText::build(&input.pages, &self.progress);
        let preprocessing_ms = started.elapsed().as_millis() as u64;

        let chunking_started = Instant::now();
        if joined.text.is_empty() {
            tracing::debug!(document_id = %input.document_id, "Document has no text");
            return (
                Vec::new(),
                ChunkTimings {
                    preprocessing_ms,
                    chunking_ms: 0,
                },
            );
        }

        let spans = self.select_spans(&joined.text);
        let headings = find_headings(&joined.text);
        let now = Utc::now();

        let mut chunks: Vec<Chunk> = spans
            .iter()
            .enumerate()
            .map(|(index, span)| self.assemble(input, &joined, &headings, index, span, now))
            .collect();

        self.progress.link(chunks.len() as u64);
        relationships::link_sequence(&mut chunks);
        relationships::assign_hierarchy(&mut chunks);

        let timings = ChunkTimings {
            preprocessing_ms,
            chunking_ms: chunking_started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            document_id = %input.document_id,
            pages = joined.pages.len(),
            chunks = chunks.len(),
            preprocessing_ms = timings.preprocessing_ms,
            chunking_ms = timings.chunking_ms,
            "Chunked document"
        );

        (chunks, timings)
    }

    /// The cursor loop. Returns the byte range of every chunk.
    fn select_spans(&self, text: &str) -> Vec<Span> {
        let config = &self.config;
        let overlap = config.overlap.min(config.chunk_size.saturating_sub(1));
        let options = NormalizeOptions::default();
        let document = analysis::analyze(text, 0);
        let protected: Vec<Range<usize>> = document
            .items
            .iter()
            .filter(|i| matches!(i, SpecialContent::Table(_) | SpecialContent::Code(_)))
            .map(|i| i.range())
            .collect();

        let mut spans: Vec<Span> = Vec::new();
        let mut cursor = 0;

        while cursor < text.len() {
            let mut boundary = find_boundary(text, cursor, config);
            let kept_together = loop {
                let keep = analysis::analyze(&text[cursor..boundary], 0).should_keep_together();
                let extended = extend_boundary(boundary, text.len(), &document.items, keep);
                if extended == boundary {
                    break keep;
                }
                boundary = extended;
            };

            let cleaned = normalize::normalize(&text[cursor..boundary], &options);
            let tokens = self.estimator.count(&cleaned.content);

            match spans.last_mut() {
                Some(previous) if tokens < config.min_chunk_size => {
                    tracing::debug!(
                        tokens,
                        min = config.min_chunk_size,
                        "Merging undersized span into previous chunk"
                    );
                    previous.range.end = previous.range.end.max(boundary);
                    previous.kept_together |= kept_together;
                    previous.cleaned = normalize::normalize(&text[previous.range.clone()], &options);
                }
                _ => {
                    spans.push(Span {
                        range: cursor..boundary,
                        kept_together,
                        cleaned,
                    });
                    self.progress.chunk(boundary as u64, Some(text.len() as u64), spans.len());
                }
            }

            if boundary >= text.len() {
                break;
            }
            cursor = next_cursor(text, cursor, boundary, overlap, &protected);
        }

        spans
    }

    fn assemble(
        &self,
        input: &DocumentInput,
        joined: &JoinedText,
        headings: &[Heading],
        index: usize,
        span: &Span,
        now: chrono::DateTime<Utc>,
    ) -> Chunk {
        let raw = &joined.text[span.range.clone()];
        let content = span.cleaned.content.clone();

        let start_page = joined.page_at(span.range.start).map_or(1, |p| p.page_number);
        let end_page = joined
            .page_at(span.range.end.saturating_sub(1))
            .map_or(start_page, |p| p.page_number)
            .max(start_page);

        let analysis = analysis::analyze(&content, start_page);
        let breakdown = self.estimator.estimate(&content);
        let weight = analysis.weight();

        let mut transformations: Vec<String> = Vec::new();
        let mut quality_score = 100;
        for page in joined.pages_in(&span.range) {
            quality_score = quality_score.min(page.quality_score);
            for label in &page.transformations {
                if !transformations.contains(label) {
                    transformations.push(label.clone());
                }
            }
        }
        for label in &span.cleaned.transformations {
            if !transformations.contains(label) {
                transformations.push(label.clone());
            }
        }

        let middle = span.range.start + (span.range.end - span.range.start) / 2;
        let page_position = joined
            .page_at(middle)
            .map(|page| {
                let len = page.range.len().max(1) as f64;
                let offset = middle.saturating_sub(page.range.start) as f64;
                PagePosition::from_relative((offset / len).min(1.0))
            })
            .unwrap_or(PagePosition::Top);

        let (section_header, section_path, level) = section_context(headings, &span.range);

        let metadata = ChunkMetadata {
            document_id: input.document_id.clone(),
            chunk_index: index,
            start_page,
            end_page,
            section_header,
            section_path,
            document_title: input.title.clone(),
            author: input.author.clone(),
            page_position,
            flags: ContentFlags::from_analysis(&analysis),
            token_count: (breakdown.total as f64 * weight).round() as usize,
            token_breakdown: breakdown,
            special_content: analysis.counts(),
            content_weight: weight,
            kept_together: span.kept_together,
            preprocessing: PreprocessingInfo {
                original_length: raw.chars().count(),
                normalized_length: content.chars().count(),
                transformations,
                quality_score,
            },
            content_hash: calculate_hash(&content),
            byte_range: span.range.clone(),
            document_context: None,
            section_context: None,
            content_stats: None,
            semantic_context: None,
            processing_stats: None,
            quality_metrics: None,
        };

        Chunk {
            id: Chunk::make_id(&input.document_id, index),
            content,
            metadata,
            relationships: Relationships {
                hierarchy_level: level,
                ..Relationships::default()
            },
            tenant_id: input.tenant_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 120,
            overlap: 20,
            respect_sentences: true,
            respect_paragraphs: true,
            min_chunk_size: 5,
        }
    }

    fn doc(pages: Vec<PageText>) -> DocumentInput {
        DocumentInput::new("doc-1", "tenant-a", pages)
    }

    #[test]
    fn test_join_records_page_ranges() {
        let pages = vec![
            PageText::new(1, "First page."),
            PageText::new(2, "   "),
            PageText::new(3, "Third page."),
        ];
        let joined = JoinedText::build(&pages, &ProgressReporter::noop());
        assert_eq!(joined.text, "First page.\n\nThird page.");
        assert_eq!(joined.pages.len(), 2);
        assert_eq!(joined.page_at(12).map(|p| p.page_number), Some(1));
        assert_eq!(joined.page_at(13).map(|p| p.page_number), Some(3));
    }

    #[test]
    fn test_single_short_document() {
        let chunks = DocumentChunker::new(small_config()).chunk(&doc(vec![PageText::new(4, "Just one line.")]));
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.id, "doc-1_chunk_0");
        assert_eq!(chunk.content, "Just one line.");
        assert_eq!(chunk.metadata.start_page, 4);
        assert_eq!(chunk.metadata.end_page, 4);
        assert_eq!(chunk.tenant_id, "tenant-a");
        assert!(chunk.relationships.previous_chunk_id.is_none());
        assert!(chunk.relationships.next_chunk_id.is_none());
    }

    #[test]
    fn test_chunks_span_pages() {
        let page = |n: u32| PageText::new(n, format!("Page {n} talks about the pump and the valve in some detail here."));
        let chunks = DocumentChunker::new(small_config()).chunk(&doc((1..=4).map(page).collect()));
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].metadata.start_page, 1);
        assert_eq!(chunks.last().map(|c| c.metadata.end_page), Some(4));
        for pair in chunks.windows(2) {
            assert!(pair[0].metadata.start_page <= pair[1].metadata.start_page);
        }
    }

    #[test]
    fn test_section_headers_and_levels() {
        let text = "# Safety\nRead everything first. Keep the area clean and dry at all times.\n\n## Electrical\nDisconnect power before service. Wait for capacitors to drain fully.\n\n## Mechanical\nSupport the load before removing any fastener from the frame.";
        let config = ChunkConfig {
            overlap: 0,
            ..small_config()
        };
        let chunks = DocumentChunker::new(config).chunk(&doc(vec![PageText::new(1, text)]));
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].metadata.section_header.as_deref(), Some("Safety"));
        assert_eq!(chunks[0].relationships.hierarchy_level, 0);
        assert_eq!(chunks[1].metadata.section_header.as_deref(), Some("Electrical"));

        let last = &chunks[2];
        assert_eq!(last.metadata.section_header.as_deref(), Some("Mechanical"));
        assert_eq!(last.metadata.section_path, vec!["Safety", "Mechanical"]);
        assert_eq!(last.relationships.hierarchy_level, 1);
        assert_eq!(last.relationships.parent_chunk_id.as_deref(), Some(chunks[0].id.as_str()));
        assert_eq!(chunks[0].relationships.child_chunk_ids, vec![chunks[1].id.clone(), last.id.clone()]);
    }

    #[test]
    fn test_hash_and_provenance() {
        let raw = "\u{e2}\u{20ac}\u{153}Quoted\u{e2}\u{20ac}\u{9d} text with a longer tail so the repair stays small.";
        let chunks = DocumentChunker::new(small_config()).chunk(&doc(vec![PageText::new(1, raw)]));
        let meta = &chunks[0].metadata;
        let expected = "\"Quoted\" text with a longer tail so the repair stays small.";
        assert_eq!(chunks[0].content, expected);
        assert_eq!(meta.content_hash, calculate_hash(expected));
        assert!(meta
            .preprocessing
            .transformations
            .contains(&normalize::FIXED_ENCODING.to_string()));
        assert_eq!(meta.preprocessing.quality_score, 100);
    }

    #[test]
    fn test_content_matches_cleaned_byte_range() {
        let text = "Short intro.\n\nThe pump housing holds the impeller and the seal. It is cast iron.\n\nOk.\n\nThe valve body mounts below the pump and carries the relief spring.";
        let config = ChunkConfig {
            min_chunk_size: 8,
            ..small_config()
        };
        let input = doc(vec![PageText::new(1, text)]);
        let chunks = DocumentChunker::new(config).chunk(&input);
        let joined = JoinedText::build(&input.pages, &ProgressReporter::noop());

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            let range = chunk.metadata.byte_range.clone();
            assert_eq!(chunk.content, normalize::clean_for_embedding(&joined.text[range]));
        }
    }

    #[test]
    fn test_table_is_never_split() {
        let rows: String = (0..12)
            .map(|i| format!("| M{i} | {} Nm | dry thread |\n", 10 + i))
            .collect();
        let text = format!("Intro sentence before the torque table.\n\n{rows}\nClosing remarks follow the table here.");
        let chunks = DocumentChunker::new(small_config()).chunk(&doc(vec![PageText::new(1, text)]));

        let holders: Vec<_> = chunks.iter().filter(|c| c.content.contains("| M0 |")).collect();
        assert!(!holders.is_empty());
        assert!(holders.iter().any(|c| c.content.contains("| M11 |")));
        assert!(holders.iter().all(|c| c.metadata.flags.has_table));
    }
}
