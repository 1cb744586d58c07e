//! Special-content analysis for a span of text.
//!
//! Detects tables, lists, diagram references, code blocks and technical tokens,
//! and decides whether a span must stay in one chunk. Every detected structure
//! carries the byte range it occupies in the analyzed text.

pub mod code;
pub mod diagrams;
pub mod lists;
pub mod tables;
pub mod technical;

pub use code::CodeSpan;
pub use diagrams::{DiagramKind, DiagramRef};
pub use lists::{ListItem, ListKind, ListSpan};
pub use tables::{TableSpan, TableStyle};
pub use technical::{TechnicalKind, TechnicalToken};

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Lists longer than this are allowed to split across chunks.
pub const MAX_KEEP_TOGETHER_LIST_ITEMS: usize = 10;

/// Technical hits at or above this count make a span keep-together.
pub const DENSE_TECHNICAL_HITS: usize = 4;

/// One detected structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpecialContent {
    Table(TableSpan),
    List(ListSpan),
    Diagram(DiagramRef),
    Code(CodeSpan),
    Technical(TechnicalToken),
}

/// Discriminant of [`SpecialContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecialKind {
    Table,
    List,
    Diagram,
    Code,
    Technical,
}

impl SpecialContent {
    pub fn range(&self) -> Range<usize> {
        match self {
            SpecialContent::Table(t) => t.range.clone(),
            SpecialContent::List(l) => l.range.clone(),
            SpecialContent::Diagram(d) => d.range.clone(),
            SpecialContent::Code(c) => c.range.clone(),
            SpecialContent::Technical(t) => t.range.clone(),
        }
    }

    pub fn kind(&self) -> SpecialKind {
        match self {
            SpecialContent::Table(_) => SpecialKind::Table,
            SpecialContent::List(_) => SpecialKind::List,
            SpecialContent::Diagram(_) => SpecialKind::Diagram,
            SpecialContent::Code(_) => SpecialKind::Code,
            SpecialContent::Technical(_) => SpecialKind::Technical,
        }
    }

    /// Whether a chunk boundary may never fall strictly inside this structure.
    pub fn is_atomic(&self) -> bool {
        match self {
            SpecialContent::Table(_) | SpecialContent::Code(_) | SpecialContent::Diagram(_) => {
                true
            }
            SpecialContent::List(l) => l.items.len() <= MAX_KEEP_TOGETHER_LIST_ITEMS,
            SpecialContent::Technical(_) => false,
        }
    }
}

/// Why a span has to stay in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeepReason {
    Table,
    ShortList,
    Code,
    Diagram,
    DenseTechnical,
}

/// Per-kind structure counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialContentCounts {
    pub tables: usize,
    pub lists: usize,
    pub diagrams: usize,
    pub code_blocks: usize,
    pub technical_formats: usize,
}

impl SpecialContentCounts {
    pub fn total(&self) -> usize {
        self.tables + self.lists + self.diagrams + self.code_blocks + self.technical_formats
    }

    pub fn add(&mut self, other: &SpecialContentCounts) {
        self.tables += other.tables;
        self.lists += other.lists;
        self.diagrams += other.diagrams;
        self.code_blocks += other.code_blocks;
        self.technical_formats += other.technical_formats;
    }
}

/// Result of [`analyze`]. Items are sorted by start offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub page_number: u32,
    pub items: Vec<SpecialContent>,
}

impl ContentAnalysis {
    pub fn tables(&self) -> impl Iterator<Item = &TableSpan> {
        self.items.iter().filter_map(|i| match i {
            SpecialContent::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn lists(&self) -> impl Iterator<Item = &ListSpan> {
        self.items.iter().filter_map(|i| match i {
            SpecialContent::List(l) => Some(l),
            _ => None,
        })
    }

    pub fn diagrams(&self) -> impl Iterator<Item = &DiagramRef> {
        self.items.iter().filter_map(|i| match i {
            SpecialContent::Diagram(d) => Some(d),
            _ => None,
        })
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeSpan> {
        self.items.iter().filter_map(|i| match i {
            SpecialContent::Code(c) => Some(c),
            _ => None,
        })
    }

    pub fn technical(&self) -> impl Iterator<Item = &TechnicalToken> {
        self.items.iter().filter_map(|i| match i {
            SpecialContent::Technical(t) => Some(t),
            _ => None,
        })
    }

    pub fn counts(&self) -> SpecialContentCounts {
        let mut counts = SpecialContentCounts::default();
        for item in &self.items {
            match item.kind() {
                SpecialKind::Table => counts.tables += 1,
                SpecialKind::List => counts.lists += 1,
                SpecialKind::Diagram => counts.diagrams += 1,
                SpecialKind::Code => counts.code_blocks += 1,
                SpecialKind::Technical => counts.technical_formats += 1,
            }
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep-together policy, checked in priority order. A span with lists is
    /// decided by the list size alone.
    pub fn keep_together_reason(&self) -> Option<KeepReason> {
        let counts = self.counts();

        if counts.tables > 0 {
            return Some(KeepReason::Table);
        }
        if counts.lists > 0 {
            let items: usize = self.lists().map(|l| l.items.len()).sum();
            return (items <= MAX_KEEP_TOGETHER_LIST_ITEMS).then_some(KeepReason::ShortList);
        }
        if counts.code_blocks > 0 {
            return Some(KeepReason::Code);
        }
        if counts.diagrams > 0 {
            return Some(KeepReason::Diagram);
        }
        if counts.technical_formats >= DENSE_TECHNICAL_HITS {
            return Some(KeepReason::DenseTechnical);
        }
        None
    }

    pub fn should_keep_together(&self) -> bool {
        self.keep_together_reason().is_some()
    }

    /// Content weight multiplier, at least 1.0.
    pub fn weight(&self) -> f64 {
        let counts = self.counts();
        let mut weight = 1.0;
        if counts.tables > 0 {
            weight *= 1.5;
        }
        if counts.lists > 0 {
            weight *= 1.3;
        }
        if counts.code_blocks > 0 {
            weight *= 1.8;
        }
        if counts.diagrams > 0 {
            weight *= 1.4;
        }
        if counts.technical_formats > 0 {
            weight *= 1.2;
        }
        weight
    }

    /// Ranges a boundary must not cut through.
    pub fn atomic_ranges(&self) -> Vec<Range<usize>> {
        self.items
            .iter()
            .filter(|i| i.is_atomic())
            .map(|i| i.range())
            .collect()
    }
}

/// Detect all special content in `text`.
pub fn analyze(text: &str, page_number: u32) -> ContentAnalysis {
    let lines = split_lines(text);
    let mut items = Vec::new();

    let code = code::detect(&lines, page_number);
    let mut claimed: Vec<Range<usize>> = code.iter().map(|c| c.range.clone()).collect();
    let code_ranges = claimed.clone();
    items.extend(code.into_iter().map(SpecialContent::Code));

    let tables = tables::detect(&lines, &claimed, page_number);
    claimed.extend(tables.iter().map(|t| t.range.clone()));
    items.extend(tables.into_iter().map(SpecialContent::Table));

    let diagrams = diagrams::detect(&lines, &claimed, page_number);
    claimed.extend(diagrams.iter().map(|d| d.range.clone()));
    items.extend(diagrams.into_iter().map(SpecialContent::Diagram));

    let lists = lists::detect(&lines, &claimed, page_number);
    items.extend(lists.into_iter().map(SpecialContent::List));

    let tokens = technical::detect(text, &code_ranges);
    items.extend(tokens.into_iter().map(SpecialContent::Technical));

    items.sort_by_key(|i| (i.range().start, i.range().end));
    ContentAnalysis { page_number, items }
}

/// A line of the analyzed text with its byte offsets. `end` excludes the newline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn indent(&self) -> usize {
        indent_width(self.text)
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split('\n') {
        let content = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(Line {
            start,
            end: start + content.len(),
            text: content,
        });
        start += raw.len() + 1;
    }
    lines
}

/// Leading whitespace width; tabs count as four columns.
pub(crate) fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

pub(crate) fn overlaps_any(range: &Range<usize>, claimed: &[Range<usize>]) -> bool {
    claimed
        .iter()
        .any(|c| range.start < c.end && c.start < range.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prose_has_no_structure() {
        let analysis = analyze("Just a sentence about nothing in particular.", 1);
        assert!(analysis.is_empty());
        assert!(!analysis.should_keep_together());
        assert_eq!(analysis.weight(), 1.0);
    }

    #[test]
    fn test_table_forces_keep_together() {
        let text = "Intro line\n| Name | Value |\n|------|-------|\n| A | 1 |\n";
        let analysis = analyze(text, 2);
        assert_eq!(analysis.counts().tables, 1);
        assert_eq!(analysis.keep_together_reason(), Some(KeepReason::Table));
        assert!(analysis.weight() >= 1.5);
    }

    #[test]
    fn test_long_list_blocks_keep_together() {
        let text: String = (1..=12).map(|i| format!("- item number {}\n", i)).collect();
        let analysis = analyze(&text, 1);
        assert_eq!(analysis.counts().lists, 1);
        assert_eq!(analysis.keep_together_reason(), None);

        let short: String = (1..=3).map(|i| format!("- item {}\n", i)).collect();
        assert_eq!(
            analyze(&short, 1).keep_together_reason(),
            Some(KeepReason::ShortList)
        );
    }

    #[test]
    fn test_dense_technical_tokens() {
        let text = "Use 12 V, 3 A, 50 Nm and 20 mm spacers.";
        let analysis = analyze(text, 1);
        assert_eq!(analysis.counts().technical_formats, 4);
        assert_eq!(
            analysis.keep_together_reason(),
            Some(KeepReason::DenseTechnical)
        );
        assert!((analysis.weight() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_weight_is_multiplicative() {
        let text = "```\nlet x = 1;\n```\n\nFigure 2 - Layout\n";
        let analysis = analyze(text, 1);
        let counts = analysis.counts();
        assert_eq!(counts.code_blocks, 1);
        assert_eq!(counts.diagrams, 1);
        assert!((analysis.weight() - 1.8 * 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_split_lines_offsets() {
        let text = "ab\r\ncd\n\nef";
        let lines = split_lines(text);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "ab");
        assert_eq!(&text[lines[1].start..lines[1].end], "cd");
        assert!(lines[2].is_blank());
        assert_eq!(&text[lines[3].start..lines[3].end], "ef");
    }
}
