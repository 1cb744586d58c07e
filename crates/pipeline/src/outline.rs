//! Document outline: title, section headers, table of contents and keywords.
//!
//! Works on raw page text, line by line. Header detection recognizes
//! Markdown (`## Title`), numbered (`3.2 Title`), ALL CAPS and Title Case
//! lines.

use crate::types::PageText;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z][^\n]{10,80})$").expect("valid title regex"));

static CAPS_TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z \t]{10,80})$").expect("valid caps title regex"));

static HEADER_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^page\s+\d+|^\d+\s*$|^chapter\s+\d+|^section\s+\d+|copyright|©|\(c\)|confidential|proprietary")
        .expect("valid header/footer regex")
});

static MARKDOWN_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid markdown header regex"));

static NUMBERED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+(.+)$").expect("valid numbered header regex")
});

static KEYWORD_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"\b[A-Z]{2,5}\b").expect("valid acronym regex"),
        Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:mm|cm|m|inch|ft|kg|lb|°C|°F|Hz|MHz|GHz|V|A|W|GB|MB|KB)\b")
            .expect("valid keyword measurement regex"),
        Regex::new(r"\b[A-Z]\d+[A-Z]\b").expect("valid short part regex"),
        Regex::new(r"\b[A-Z]\d+[A-Z]-\d+\b").expect("valid dashed part regex"),
    ]
});

const TITLE_CASE_FILLERS: &[&str] = &[
    "and", "or", "the", "a", "an", "in", "on", "at", "to", "for", "of", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderStyle {
    Markdown,
    Numbered,
    AllCaps,
    TitleCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderKind {
    Title,
    Heading,
    Section,
    Subsection,
}

impl HeaderKind {
    fn for_level(level: u32) -> Self {
        match level {
            1 => HeaderKind::Title,
            3 => HeaderKind::Section,
            l if l >= 4 => HeaderKind::Subsection,
            _ => HeaderKind::Heading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeader {
    pub text: String,
    /// 1 for top-level headers
    pub level: u32,
    pub page_number: u32,
    /// Line index within the page
    pub position: usize,
    pub style: HeaderStyle,
    #[serde(rename = "type")]
    pub kind: HeaderKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub header: SectionHeader,
    /// Index of the enclosing entry; `None` at the top level
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOfContents {
    pub entries: Vec<TocEntry>,
}

impl TableOfContents {
    pub fn roots(&self) -> impl Iterator<Item = &TocEntry> {
        self.entries.iter().filter(|e| e.parent.is_none())
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = &TocEntry> {
        self.entries.iter().filter(move |e| e.parent == Some(index))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutline {
    pub title: Option<String>,
    pub page_count: usize,
    pub headers: Vec<SectionHeader>,
    pub table_of_contents: TableOfContents,
    pub keywords: Vec<String>,
}

/// Title candidate from the first page: a capitalized 11-81 char line, then
/// an all-caps line, skipping anything that looks like a running header.
pub fn extract_title(first_page: &PageText) -> Option<String> {
    [&*TITLE_LINE, &*CAPS_TITLE_LINE].iter().find_map(|re| {
        re.captures_iter(&first_page.text)
            .map(|caps| caps[1].trim().to_string())
            .find(|candidate| !HEADER_FOOTER.is_match(candidate))
    })
}

pub fn extract_headers(pages: &[PageText]) -> Vec<SectionHeader> {
    pages
        .iter()
        .flat_map(|page| {
            page.text
                .lines()
                .enumerate()
                .filter_map(move |(i, line)| classify_line(line.trim(), i, page.page_number))
        })
        .collect()
}

fn classify_line(line: &str, position: usize, page_number: u32) -> Option<SectionHeader> {
    let length = line.chars().count();
    if !(3..=100).contains(&length) {
        return None;
    }

    let header = |text: &str, level: u32, style: HeaderStyle, kind: HeaderKind| SectionHeader {
        text: text.trim().to_string(),
        level,
        page_number,
        position,
        style,
        kind,
    };

    if let Some(caps) = MARKDOWN_HEADER.captures(line) {
        let level = caps[1].len() as u32;
        return Some(header(&caps[2], level, HeaderStyle::Markdown, HeaderKind::for_level(level)));
    }

    // A trailing period marks a numbered list item rather than a heading.
    if let Some(caps) = NUMBERED_HEADER.captures(line) {
        if !line.ends_with(['.', '!', '?', ':', ';', ',']) {
            let level = caps[1].split('.').count() as u32;
            return Some(header(&caps[2], level, HeaderStyle::Numbered, HeaderKind::for_level(level)));
        }
        return None;
    }

    if is_all_caps(line, length) {
        return Some(header(line, 1, HeaderStyle::AllCaps, HeaderKind::Heading));
    }

    if is_title_case(line, length) {
        return Some(header(line, 2, HeaderStyle::TitleCase, HeaderKind::Section));
    }

    None
}

fn is_all_caps(line: &str, length: usize) -> bool {
    let letters = line.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let upper = line.chars().filter(|c| c.is_ascii_uppercase()).count();
    letters > 5 && upper as f64 / letters as f64 > 0.8 && length < 60
}

fn is_title_case(line: &str, length: usize) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    let title_words = words
        .iter()
        .filter(|word| {
            let mut chars = word.chars();
            let capitalized = matches!(
                (chars.next(), chars.next()),
                (Some(first), Some(second)) if first.is_ascii_uppercase() && second.is_ascii_lowercase()
            );
            capitalized || TITLE_CASE_FILLERS.contains(&word.to_lowercase().as_str())
        })
        .count();

    words.len() >= 2
        && title_words as f64 / words.len() as f64 > 0.6
        && length < 80
        && !line.ends_with(['.', '!', '?'])
}

/// Nest headers by level: each header's parent is the closest earlier header
/// with a lower level.
pub fn build_toc(headers: &[SectionHeader]) -> TableOfContents {
    let mut sorted: Vec<SectionHeader> = headers.to_vec();
    sorted.sort_by_key(|h| (h.page_number, h.position));

    let mut entries: Vec<TocEntry> = Vec::with_capacity(sorted.len());
    for header in sorted {
        let parent = entries.iter().rposition(|e| e.header.level < header.level);
        entries.push(TocEntry { header, parent });
    }
    TableOfContents { entries }
}

/// Acronyms, measurements and part numbers, deduplicated in first-seen order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for re in KEYWORD_PATTERNS.iter() {
        for m in re.find_iter(text) {
            if !keywords.iter().any(|k| k == m.as_str()) {
                keywords.push(m.as_str().to_string());
            }
        }
    }
    keywords
}

/// Full outline of a document. A caller-supplied title wins over detection.
pub fn outline(pages: &[PageText], title: Option<&str>) -> DocumentOutline {
    let headers = extract_headers(pages);
    let all_text = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    DocumentOutline {
        title: title
            .map(str::to_string)
            .or_else(|| pages.first().and_then(extract_title)),
        page_count: pages.len(),
        table_of_contents: build_toc(&headers),
        headers,
        keywords: extract_keywords(&all_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_skips_running_headers() {
        let page = PageText::new(1, "Page 1 of 40\nHydraulic Pump Service Manual\nbody text");
        assert_eq!(extract_title(&page).as_deref(), Some("Hydraulic Pump Service Manual"));

        let page = PageText::new(1, "short\nlowercase line that is long enough");
        assert_eq!(extract_title(&page), None);
    }

    #[test]
    fn test_header_styles() {
        let page = PageText::new(
            3,
            "## Wiring\n2.1 Main Supply\n1. Loosen the nut.\nSAFETY NOTICES\nRemoving the Cover\nplain sentence that should be ignored",
        );
        let headers = extract_headers(&[page]);
        let summary: Vec<_> = headers
            .iter()
            .map(|h| (h.text.as_str(), h.level, h.style))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Wiring", 2, HeaderStyle::Markdown),
                ("Main Supply", 2, HeaderStyle::Numbered),
                ("SAFETY NOTICES", 1, HeaderStyle::AllCaps),
                ("Removing the Cover", 2, HeaderStyle::TitleCase),
            ]
        );
        assert!(headers.iter().all(|h| h.page_number == 3));
        assert_eq!(headers[1].position, 1);
    }

    #[test]
    fn test_toc_nesting() {
        let pages = vec![
            PageText::new(1, "# Maintenance\n## Filters\n### Replacing"),
            PageText::new(2, "## Belts"),
        ];
        let toc = build_toc(&extract_headers(&pages));
        assert_eq!(toc.roots().count(), 1);
        let children: Vec<_> = toc.children(0).map(|e| e.header.text.as_str()).collect();
        assert_eq!(children, vec!["Filters", "Belts"]);
        assert_eq!(toc.entries[2].parent, Some(1));
    }

    #[test]
    fn test_keywords() {
        let keywords = extract_keywords("Set the PLC to 24 V. Use part A12B and A12B-7. PLC again.");
        assert_eq!(keywords, vec!["PLC", "24 V", "A12B", "A12B-7"]);
    }

    #[test]
    fn test_outline_prefers_caller_title() {
        let pages = vec![PageText::new(1, "Hydraulic Pump Service Manual\n# Safety")];
        assert_eq!(outline(&pages, Some("Given")).title.as_deref(), Some("Given"));
        let detected = outline(&pages, None);
        assert_eq!(detected.title.as_deref(), Some("Hydraulic Pump Service Manual"));
        assert_eq!(detected.page_count, 1);
        assert_eq!(detected.table_of_contents.entries.len(), 2);
    }
}
